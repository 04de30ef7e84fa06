use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use anyhow::Context as _;
use cfg_if::cfg_if;
use ort::Session;

use crate::metas::{RawStyleId, StyleId, VoiceModelMeta};
use crate::model_file::{ModelBytes, ModelFileSet};
use crate::{Error, Result};

/// セッション構築時のオプション。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct SessionOptions {
    cpu_num_threads: u16,
    use_gpu: bool,
}

impl SessionOptions {
    pub(crate) fn new(cpu_num_threads: u16, use_gpu: bool) -> Self {
        Self {
            cpu_num_threads,
            use_gpu,
        }
    }
}

/// 読み込んだモデルのセッションとメタ情報を保持する。
///
/// モデル表は挿入のみで、一度埋まったスロットのセッションは差し替えない。
/// 推論側は読み取りロックで`Arc`を複製して使うため、複数スレッドから同時に呼べる。
pub(crate) struct Status {
    model_file_set: Arc<ModelFileSet>,
    models: RwLock<BTreeMap<usize, Arc<ModelBundle>>>,
    metas: VoiceModelMeta,
    supported_styles: BTreeSet<RawStyleId>,
    light_session_options: SessionOptions,
    heavy_session_options: SessionOptions,
}

impl Status {
    pub(crate) fn new(
        model_file_set: Arc<ModelFileSet>,
        use_gpu: bool,
        cpu_num_threads: u16,
    ) -> Self {
        Self {
            model_file_set,
            models: RwLock::new(BTreeMap::new()),
            metas: Vec::new(),
            supported_styles: BTreeSet::new(),
            // 音素長・音高モデルは常にCPU。GPUはデコーダにだけ使う。
            light_session_options: SessionOptions::new(cpu_num_threads, false),
            heavy_session_options: SessionOptions::new(cpu_num_threads, use_gpu),
        }
    }

    pub(crate) fn load_metas(&mut self) -> Result<()> {
        let metas: VoiceModelMeta = serde_json::from_str(&self.model_file_set.metas_str)
            .context("invalid metas.json")
            .map_err(Error::LoadMetas)?;

        self.supported_styles = metas
            .iter()
            .flat_map(|speaker| &speaker.styles)
            .map(|style| style.id.raw_id())
            .collect();
        self.metas = metas;
        Ok(())
    }

    pub(crate) fn metas(&self) -> &VoiceModelMeta {
        &self.metas
    }

    pub(crate) fn models_count(&self) -> usize {
        self.model_file_set.models_count()
    }

    pub(crate) fn validate_speaker_id(&self, style_id: StyleId) -> bool {
        self.supported_styles.contains(&style_id.raw_id())
    }

    /// スタイルIDを(モデル番号, モデル内スタイルID)へ振り分ける。
    /// 表にないIDはモデル0に属し、モデル内スタイルIDはそのままの値。
    pub(crate) fn get_model_index_and_speaker_id(&self, style_id: StyleId) -> (usize, RawStyleId) {
        let raw_id = style_id.raw_id();
        self.model_file_set
            .style_id_map
            .get(&raw_id)
            .copied()
            .unwrap_or((0, raw_id))
    }

    pub(crate) fn load_model(&self, model_index: usize) -> Result<()> {
        if model_index >= self.model_file_set.models_count() {
            return Err(Error::ModelNotLoaded { model_index });
        }
        if self.is_model_loaded(model_index) {
            return Ok(());
        }

        let model_bytes = self.model_file_set.read_model_bytes(model_index)?;
        let bundle = ModelBundle::new(
            &model_bytes,
            &self.light_session_options,
            &self.heavy_session_options,
        )
        .map_err(Error::LoadModel)?;

        self.models
            .write()
            .unwrap()
            .entry(model_index)
            .or_insert_with(|| Arc::new(bundle));
        tracing::info!("loaded model {model_index}");
        Ok(())
    }

    pub(crate) fn is_model_loaded(&self, model_index: usize) -> bool {
        self.models.read().unwrap().contains_key(&model_index)
    }

    pub(crate) fn models_for(&self, model_index: usize) -> Result<Arc<ModelBundle>> {
        self.models
            .read()
            .unwrap()
            .get(&model_index)
            .cloned()
            .ok_or(Error::ModelNotLoaded { model_index })
    }
}

/// 1モデル分の3つの推論セッション。
pub(crate) struct ModelBundle {
    predict_duration_session: Session,
    predict_intonation_session: Session,
    decode_session: Session,
}

impl ModelBundle {
    fn new(
        model_bytes: &ModelBytes,
        light_session_options: &SessionOptions,
        heavy_session_options: &SessionOptions,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            predict_duration_session: new_session(
                &model_bytes.predict_duration_model,
                light_session_options,
            )?,
            predict_intonation_session: new_session(
                &model_bytes.predict_intonation_model,
                light_session_options,
            )?,
            decode_session: new_session(&model_bytes.decode_model, heavy_session_options)?,
        })
    }

    pub(crate) fn predict_duration(
        &self,
        phoneme_vector: &[i64],
        model_inner_id: RawStyleId,
    ) -> Result<Vec<f32>> {
        let input_tensors = ort::inputs![
            "phoneme_list" => ndarray::arr1(phoneme_vector),
            "speaker_id" => ndarray::arr1(&[i64::from(model_inner_id)]),
        ]
        .map_err(into_inference_error)?;

        let output_tensors = self
            .predict_duration_session
            .run(input_tensors)
            .map_err(into_inference_error)?;
        Ok(output_tensors["phoneme_length"]
            .extract_tensor::<f32>()
            .map_err(into_inference_error)?
            .view()
            .to_owned()
            .into_raw_vec())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn predict_intonation(
        &self,
        length: usize,
        vowel_phoneme_vector: &[i64],
        consonant_phoneme_vector: &[i64],
        start_accent_vector: &[i64],
        end_accent_vector: &[i64],
        start_accent_phrase_vector: &[i64],
        end_accent_phrase_vector: &[i64],
        model_inner_id: RawStyleId,
    ) -> Result<Vec<f32>> {
        let input_tensors = ort::inputs![
            "length" => ndarray::arr0(length as i64),
            "vowel_phoneme_list" => ndarray::arr1(vowel_phoneme_vector),
            "consonant_phoneme_list" => ndarray::arr1(consonant_phoneme_vector),
            "start_accent_list" => ndarray::arr1(start_accent_vector),
            "end_accent_list" => ndarray::arr1(end_accent_vector),
            "start_accent_phrase_list" => ndarray::arr1(start_accent_phrase_vector),
            "end_accent_phrase_list" => ndarray::arr1(end_accent_phrase_vector),
            "speaker_id" => ndarray::arr1(&[i64::from(model_inner_id)]),
        ]
        .map_err(into_inference_error)?;

        let output_tensors = self
            .predict_intonation_session
            .run(input_tensors)
            .map_err(into_inference_error)?;
        Ok(output_tensors["f0_list"]
            .extract_tensor::<f32>()
            .map_err(into_inference_error)?
            .view()
            .to_owned()
            .into_raw_vec())
    }

    pub(crate) fn decode(
        &self,
        length: usize,
        phoneme_size: usize,
        f0: &[f32],
        phoneme_vector: &[f32],
        model_inner_id: RawStyleId,
    ) -> Result<Vec<f32>> {
        let input_tensors = ort::inputs![
            "f0" => ndarray::arr1(f0)
                .into_shape([length, 1])
                .map_err(into_inference_error)?,
            "phoneme" => ndarray::arr1(phoneme_vector)
                .into_shape([length, phoneme_size])
                .map_err(into_inference_error)?,
            "speaker_id" => ndarray::arr1(&[i64::from(model_inner_id)]),
        ]
        .map_err(into_inference_error)?;

        let output_tensors = self
            .decode_session
            .run(input_tensors)
            .map_err(into_inference_error)?;
        Ok(output_tensors["wave"]
            .extract_tensor::<f32>()
            .map_err(into_inference_error)?
            .view()
            .to_owned()
            .into_raw_vec())
    }
}

fn into_inference_error(source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::InferenceFailed(source.into())
}

fn new_session(model_bytes: &[u8], options: &SessionOptions) -> anyhow::Result<Session> {
    let mut builder = Session::builder()?;
    if options.cpu_num_threads != 0 {
        builder = builder
            .with_intra_threads(options.cpu_num_threads.into())?
            .with_inter_threads(options.cpu_num_threads.into())?;
    }
    if options.use_gpu {
        cfg_if! {
            if #[cfg(feature = "directml")] {
                builder = builder.with_execution_providers(
                    [ort::DirectMLExecutionProvider::default().build()],
                )?;
            } else if #[cfg(feature = "cuda")] {
                builder = builder.with_execution_providers(
                    [ort::CUDAExecutionProvider::default().build()],
                )?;
            } else {
                anyhow::bail!("GPU向けにビルドされていません");
            }
        }
    }
    Ok(builder.with_model_from_memory(model_bytes)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{SessionOptions, Status};
    use crate::metas::StyleId;
    use crate::model_file::ModelFileSet;
    use crate::test_util::SAMPLE_METAS_JSON;
    use crate::Error;

    fn status() -> Status {
        let model_file_set = ModelFileSet::new(SAMPLE_METAS_JSON.to_string(), vec![]);
        let mut status = Status::new(Arc::new(model_file_set), false, 0);
        status.load_metas().unwrap();
        status
    }

    #[rstest]
    #[case(true, 0)]
    #[case(true, 1)]
    #[case(false, 8)]
    fn status_new_works(#[case] use_gpu: bool, #[case] cpu_num_threads: u16) {
        let model_file_set = ModelFileSet::new("[]".to_string(), vec![]);
        let status = Status::new(Arc::new(model_file_set), use_gpu, cpu_num_threads);
        assert_eq!(
            SessionOptions::new(cpu_num_threads, false),
            status.light_session_options
        );
        assert_eq!(
            SessionOptions::new(cpu_num_threads, use_gpu),
            status.heavy_session_options
        );
        assert!(status.models.read().unwrap().is_empty());
    }

    #[test]
    fn load_metas_collects_supported_styles() {
        let status = status();
        assert_eq!(2, status.metas().len());
        for (style_id, expected) in [(0, true), (2, true), (3, true), (1, false), (999, false)] {
            assert_eq!(
                expected,
                status.validate_speaker_id(StyleId::new(style_id)),
                "style {style_id}"
            );
        }
    }

    #[test]
    fn load_metas_with_broken_json_fails() {
        let model_file_set = ModelFileSet::new("{broken".to_string(), vec![]);
        let mut status = Status::new(Arc::new(model_file_set), false, 0);
        assert!(matches!(status.load_metas(), Err(Error::LoadMetas(_))));
    }

    #[rstest]
    #[case(0, (0, 0))]
    #[case(3, (0, 3))]
    fn empty_style_id_map_routes_to_model_zero(
        #[case] style_id: u32,
        #[case] expected: (usize, u32),
    ) {
        let status = status();
        assert_eq!(
            expected,
            status.get_model_index_and_speaker_id(StyleId::new(style_id))
        );
    }

    #[test]
    fn style_id_map_overrides_routing() {
        let model_file_set = ModelFileSet::new(SAMPLE_METAS_JSON.to_string(), vec![])
            .with_style_id_map(BTreeMap::from([(3, (1, 0))]));
        let mut status = Status::new(Arc::new(model_file_set), false, 0);
        status.load_metas().unwrap();
        assert_eq!(
            (1, 0),
            status.get_model_index_and_speaker_id(StyleId::new(3))
        );
        // 表にないIDは既定の振り分けのまま。
        assert_eq!(
            (0, 2),
            status.get_model_index_and_speaker_id(StyleId::new(2))
        );
    }

    #[test]
    fn models_for_unloaded_model_fails() {
        let status = status();
        assert!(matches!(
            status.models_for(0),
            Err(Error::ModelNotLoaded { model_index: 0 })
        ));
        assert!(!status.is_model_loaded(0));
    }

    #[test]
    fn load_model_with_out_of_range_index_fails() {
        let status = status();
        assert!(matches!(
            status.load_model(0),
            Err(Error::ModelNotLoaded { model_index: 0 })
        ));
    }
}
