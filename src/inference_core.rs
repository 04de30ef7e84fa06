use std::sync::Arc;

use cfg_if::cfg_if;

use crate::devices::SupportedDevices;
use crate::metas::{StyleId, VoiceModelMeta};
use crate::model_file::ModelFileSet;
use crate::status::Status;
use crate::{Error, Result};

const PHONEME_LENGTH_MINIMAL: f32 = 0.01;

/// モデルへの入出力と後処理を担う。スタイルIDの検証・振り分けもここで行う。
pub(crate) struct InferenceCore {
    initialized: bool,
    model_file_set: Arc<ModelFileSet>,
    status_option: Option<Status>,
}

impl InferenceCore {
    pub fn new(model_file_set: ModelFileSet) -> Self {
        Self {
            initialized: false,
            model_file_set: Arc::new(model_file_set),
            status_option: None,
        }
    }

    pub fn initialize(
        &mut self,
        use_gpu: bool,
        cpu_num_threads: u16,
        load_all_models: bool,
    ) -> Result<()> {
        self.initialized = false;
        self.status_option = None;
        if !use_gpu || can_support_gpu_feature()? {
            let mut status = Status::new(self.model_file_set.clone(), use_gpu, cpu_num_threads);

            status.load_metas()?;

            if load_all_models {
                for model_index in 0..status.models_count() {
                    status.load_model(model_index)?;
                }
            }

            self.status_option = Some(status);
            self.initialized = true;

            if use_gpu && load_all_models {
                // 一回走らせて十分なGPUメモリを確保させる。結果は捨てる。
                const LENGTH: usize = 500;
                const PHONEME_SIZE: usize = 45;
                let f0 = [0.; LENGTH];
                let phoneme = [0.; PHONEME_SIZE * LENGTH];
                let style_id = self
                    .metas()?
                    .iter()
                    .flat_map(|speaker| &speaker.styles)
                    .map(|style| style.id)
                    .next();
                if let Some(style_id) = style_id {
                    let _ = self.decode(LENGTH, PHONEME_SIZE, &f0, &phoneme, style_id);
                }
            }
            Ok(())
        } else {
            Err(Error::GpuSupport)
        }
    }

    pub fn finalize(&mut self) {
        self.initialized = false;
        self.status_option = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn status(&self) -> Result<&Status> {
        if !self.initialized {
            return Err(Error::UninitializedStatus);
        }
        self.status_option
            .as_ref()
            .ok_or(Error::UninitializedStatus)
    }

    pub fn metas(&self) -> Result<&VoiceModelMeta> {
        Ok(self.status()?.metas())
    }

    pub fn metas_json(&self) -> &str {
        &self.model_file_set.metas_str
    }

    pub fn load_model(&self, style_id: StyleId) -> Result<()> {
        let status = self.status()?;
        if !status.validate_speaker_id(style_id) {
            return Err(Error::StyleNotFound { style_id });
        }
        let (model_index, _) = status.get_model_index_and_speaker_id(style_id);
        status.load_model(model_index)
    }

    pub fn is_model_loaded(&self, style_id: StyleId) -> bool {
        if let Ok(status) = self.status() {
            let (model_index, _) = status.get_model_index_and_speaker_id(style_id);
            status.is_model_loaded(model_index)
        } else {
            false
        }
    }

    pub fn predict_duration(
        &self,
        phoneme_vector: &[i64],
        style_id: StyleId,
    ) -> Result<Vec<f32>> {
        let status = self.status()?;

        if !status.validate_speaker_id(style_id) {
            return Err(Error::StyleNotFound { style_id });
        }

        let (model_index, model_inner_id) = status.get_model_index_and_speaker_id(style_id);
        let models = status.models_for(model_index)?;

        let output = models.predict_duration(phoneme_vector, model_inner_id)?;
        Ok(apply_phoneme_length_minimal(output))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn predict_intonation(
        &self,
        length: usize,
        vowel_phoneme_vector: &[i64],
        consonant_phoneme_vector: &[i64],
        start_accent_vector: &[i64],
        end_accent_vector: &[i64],
        start_accent_phrase_vector: &[i64],
        end_accent_phrase_vector: &[i64],
        style_id: StyleId,
    ) -> Result<Vec<f32>> {
        let status = self.status()?;

        if !status.validate_speaker_id(style_id) {
            return Err(Error::StyleNotFound { style_id });
        }

        let (model_index, model_inner_id) = status.get_model_index_and_speaker_id(style_id);
        let models = status.models_for(model_index)?;

        models.predict_intonation(
            length,
            vowel_phoneme_vector,
            consonant_phoneme_vector,
            start_accent_vector,
            end_accent_vector,
            start_accent_phrase_vector,
            end_accent_phrase_vector,
            model_inner_id,
        )
    }

    pub fn decode(
        &self,
        length: usize,
        phoneme_size: usize,
        f0: &[f32],
        phoneme_vector: &[f32],
        style_id: StyleId,
    ) -> Result<Vec<f32>> {
        let status = self.status()?;

        if !status.validate_speaker_id(style_id) {
            return Err(Error::StyleNotFound { style_id });
        }

        let (model_index, model_inner_id) = status.get_model_index_and_speaker_id(style_id);
        let models = status.models_for(model_index)?;

        // 波形の端が途切れて鳴るのを避けるため、前後に無音を足してデコードし、
        // 出力からその分を削る。
        let padding_size = ((PADDING_SIZE * DEFAULT_SAMPLING_RATE) / 256.0).round() as usize;
        let start_and_end_padding_size = 2 * padding_size;
        let length_with_padding = length + start_and_end_padding_size;
        let f0_with_padding = make_f0_with_padding(f0, length_with_padding, padding_size);
        let phoneme_with_padding = make_phoneme_with_padding(
            phoneme_vector,
            phoneme_size,
            length_with_padding,
            padding_size,
        );

        let output = models.decode(
            length_with_padding,
            phoneme_size,
            &f0_with_padding,
            &phoneme_with_padding,
            model_inner_id,
        )?;

        Ok(trim_padding_from_output(output, padding_size))
    }
}

const PADDING_SIZE: f64 = 0.4;
const DEFAULT_SAMPLING_RATE: f64 = 24000.0;

fn can_support_gpu_feature() -> Result<bool> {
    let supported_devices = SupportedDevices::create()?;

    cfg_if! {
        if #[cfg(feature = "directml")] {
            Ok(supported_devices.dml)
        } else if #[cfg(feature = "cuda")] {
            Ok(supported_devices.cuda)
        } else {
            let _ = supported_devices;
            Ok(false)
        }
    }
}

fn apply_phoneme_length_minimal(mut output: Vec<f32>) -> Vec<f32> {
    for output_item in output.iter_mut() {
        if *output_item < PHONEME_LENGTH_MINIMAL {
            *output_item = PHONEME_LENGTH_MINIMAL;
        }
    }
    output
}

fn make_f0_with_padding(f0_slice: &[f32], length_with_padding: usize, padding_size: usize) -> Vec<f32> {
    let mut f0_with_padding = Vec::with_capacity(length_with_padding);
    let padding = vec![0.0; padding_size];
    f0_with_padding.extend_from_slice(&padding);
    f0_with_padding.extend_from_slice(f0_slice);
    f0_with_padding.extend_from_slice(&padding);
    f0_with_padding
}

fn make_phoneme_with_padding(
    phoneme_slice: &[f32],
    phoneme_size: usize,
    length_with_padding: usize,
    padding_size: usize,
) -> Vec<f32> {
    // 無音の音素はID 0のone-hot。
    let mut padding_phoneme = vec![0.0; phoneme_size];
    padding_phoneme[0] = 1.0;
    let padding_phoneme_len = padding_phoneme.len();
    let padding_phonemes: Vec<f32> = padding_phoneme
        .into_iter()
        .cycle()
        .take(padding_phoneme_len * padding_size)
        .collect();
    let mut phoneme_with_padding = Vec::with_capacity(phoneme_size * length_with_padding);
    phoneme_with_padding.extend_from_slice(&padding_phonemes);
    phoneme_with_padding.extend_from_slice(phoneme_slice);
    phoneme_with_padding.extend_from_slice(&padding_phonemes);

    phoneme_with_padding
}

fn trim_padding_from_output(mut output: Vec<f32>, padding_f0_size: usize) -> Vec<f32> {
    let padding_sampling_size = padding_f0_size * 256;
    output
        .drain(padding_sampling_size..output.len() - padding_sampling_size)
        .collect()
}
