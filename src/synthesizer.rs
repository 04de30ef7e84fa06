use std::path::PathBuf;

use cfg_if::cfg_if;

use crate::devices::SupportedDevices;
use crate::engine::{
    create_kana, parse_kana, validate_accent_phrases, AccentPhraseModel, AudioQueryModel,
    OpenJtalk, SynthesisEngine, DEFAULT_SAMPLING_RATE,
};
use crate::inference_core::InferenceCore;
use crate::metas::{StyleId, VoiceModelMeta};
use crate::model_file::ModelFileSet;
use crate::{Error, Result};

/// 音声シンセサイザ。すべての操作はこのハンドルを通して行う。
///
/// `initialize`/`finalize`/`load_openjtalk_dict`は排他参照を要求する。合成系の操作は
/// 共有参照で呼べるため、初期化後は複数スレッドから同時に利用できる。
pub struct Synthesizer {
    synthesis_engine: SynthesisEngine,
    use_gpu: bool,
}

impl Synthesizer {
    pub fn new(model_file_set: ModelFileSet) -> Self {
        Self {
            synthesis_engine: SynthesisEngine::new(
                InferenceCore::new(model_file_set),
                OpenJtalk::initialize(),
            ),
            use_gpu: false,
        }
    }

    pub fn new_with_initialize(
        model_file_set: ModelFileSet,
        options: InitializeOptions,
    ) -> Result<Self> {
        let mut this = Self::new(model_file_set);
        this.initialize(options)?;
        Ok(this)
    }

    pub fn initialize(&mut self, options: InitializeOptions) -> Result<()> {
        let use_gpu = match options.acceleration_mode {
            AccelerationMode::Auto => {
                let supported_devices = SupportedDevices::create()?;

                cfg_if! {
                    if #[cfg(feature = "directml")] {
                        supported_devices.dml
                    } else if #[cfg(feature = "cuda")] {
                        supported_devices.cuda
                    } else {
                        let _ = supported_devices;
                        false
                    }
                }
            }
            AccelerationMode::Cpu => false,
            AccelerationMode::Gpu => true,
        };
        self.use_gpu = use_gpu;
        self.synthesis_engine.inference_core_mut().initialize(
            use_gpu,
            options.cpu_num_threads,
            options.load_all_models,
        )?;
        if let Some(open_jtalk_dict_dir) = options.open_jtalk_dict_dir {
            self.synthesis_engine
                .load_openjtalk_dict(open_jtalk_dict_dir)?;
        }
        Ok(())
    }

    pub fn finalize(&mut self) {
        self.synthesis_engine.inference_core_mut().finalize()
    }

    pub fn is_gpu_mode(&self) -> bool {
        self.use_gpu
    }

    pub fn load_model(&self, style_id: StyleId) -> Result<()> {
        self.synthesis_engine.inference_core().load_model(style_id)
    }

    pub fn is_model_loaded(&self, style_id: StyleId) -> bool {
        self.synthesis_engine
            .inference_core()
            .is_model_loaded(style_id)
    }

    pub const fn get_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// モデル資産に付属するメタ情報JSONをそのまま返す。初期化前でも利用できる。
    pub fn get_metas_json(&self) -> &str {
        self.synthesis_engine.inference_core().metas_json()
    }

    pub fn metas(&self) -> Result<&VoiceModelMeta> {
        self.synthesis_engine.inference_core().metas()
    }

    pub fn get_supported_devices_json(&self) -> Result<serde_json::Value> {
        Ok(SupportedDevices::create()?.to_json())
    }

    pub fn audio_query(
        &self,
        text: &str,
        style_id: StyleId,
        options: AudioQueryOptions,
    ) -> Result<AudioQueryModel> {
        let accent_phrases = self.accent_phrases(text, style_id, options.into())?;
        let kana = create_kana(&accent_phrases);

        Ok(AudioQueryModel {
            accent_phrases,
            speed_scale: 1.,
            pitch_scale: 0.,
            intonation_scale: 1.,
            volume_scale: 1.,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate: DEFAULT_SAMPLING_RATE,
            output_stereo: false,
            kana,
        })
    }

    pub fn accent_phrases(
        &self,
        text: &str,
        style_id: StyleId,
        options: AccentPhrasesOptions,
    ) -> Result<Vec<AccentPhraseModel>> {
        if options.kana {
            self.synthesis_engine
                .replace_mora_data(&parse_kana(text)?, style_id)
        } else {
            if !self.synthesis_engine.is_openjtalk_dict_loaded() {
                return Err(Error::NotLoadedOpenjtalkDict);
            }
            self.synthesis_engine.create_accent_phrases(text, style_id)
        }
    }

    pub fn mora_data(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        validate_accent_phrases(accent_phrases)?;
        self.synthesis_engine
            .replace_mora_data(accent_phrases, style_id)
    }

    pub fn mora_length(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        validate_accent_phrases(accent_phrases)?;
        self.synthesis_engine
            .replace_phoneme_length(accent_phrases, style_id)
    }

    pub fn mora_pitch(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        validate_accent_phrases(accent_phrases)?;
        self.synthesis_engine
            .replace_mora_pitch(accent_phrases, style_id)
    }

    pub fn predict_duration(
        &self,
        phoneme_vector: &[i64],
        style_id: StyleId,
    ) -> Result<Vec<f32>> {
        self.synthesis_engine
            .inference_core()
            .predict_duration(phoneme_vector, style_id)
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
        self.synthesis_engine.inference_core().predict_intonation(
            length,
            vowel_phoneme_vector,
            consonant_phoneme_vector,
            start_accent_vector,
            end_accent_vector,
            start_accent_phrase_vector,
            end_accent_phrase_vector,
            style_id,
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
        self.synthesis_engine
            .inference_core()
            .decode(length, phoneme_size, f0, phoneme_vector, style_id)
    }

    /// AudioQueryからWAVバイナリを合成する。
    pub fn synthesis(
        &self,
        audio_query: &AudioQueryModel,
        style_id: StyleId,
        options: SynthesisOptions,
    ) -> Result<Vec<u8>> {
        self.synthesis_engine.synthesis_wave_format(
            audio_query,
            style_id,
            options.enable_interrogative_upspeak,
        )
    }

    /// テキストからWAVバイナリまでを一息で合成する。
    pub fn tts(&self, text: &str, style_id: StyleId, options: TtsOptions) -> Result<Vec<u8>> {
        let audio_query = self.audio_query(text, style_id, AudioQueryOptions::from(&options))?;
        self.synthesis(&audio_query, style_id, SynthesisOptions::from(&options))
    }
}

/// ハードウェアアクセラレーションモード。
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub enum AccelerationMode {
    /// 実行環境に合わせて自動的に選択する。
    #[default]
    Auto,
    Cpu,
    Gpu,
}

#[derive(Default)]
pub struct InitializeOptions {
    pub acceleration_mode: AccelerationMode,
    pub cpu_num_threads: u16,
    pub load_all_models: bool,
    pub open_jtalk_dict_dir: Option<PathBuf>,
}

#[derive(Default)]
pub struct AudioQueryOptions {
    /// 入力をAquesTalk風記法として解釈する。
    pub kana: bool,
}

#[derive(Default)]
pub struct AccentPhrasesOptions {
    /// 入力をAquesTalk風記法として解釈する。
    pub kana: bool,
}

impl From<AudioQueryOptions> for AccentPhrasesOptions {
    fn from(options: AudioQueryOptions) -> Self {
        Self { kana: options.kana }
    }
}

impl From<&TtsOptions> for AudioQueryOptions {
    fn from(options: &TtsOptions) -> Self {
        Self { kana: options.kana }
    }
}

pub struct SynthesisOptions {
    pub enable_interrogative_upspeak: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            enable_interrogative_upspeak: true,
        }
    }
}

impl From<&TtsOptions> for SynthesisOptions {
    fn from(options: &TtsOptions) -> Self {
        Self {
            enable_interrogative_upspeak: options.enable_interrogative_upspeak,
        }
    }
}

pub struct TtsOptions {
    pub kana: bool,
    pub enable_interrogative_upspeak: bool,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            kana: Default::default(),
            enable_interrogative_upspeak: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{
        AccelerationMode, AccentPhrasesOptions, AudioQueryOptions, InitializeOptions, Synthesizer,
        SynthesisOptions, TtsOptions,
    };
    use crate::engine::{AccentPhraseModel, AudioQueryModel, MoraModel};
    use crate::metas::StyleId;
    use crate::model_file::ModelFileSet;
    use crate::test_util::SAMPLE_METAS_JSON;
    use crate::Error;

    fn synthesizer() -> Synthesizer {
        Synthesizer::new(ModelFileSet::new(SAMPLE_METAS_JSON.to_string(), vec![]))
    }

    fn initialized_synthesizer() -> Synthesizer {
        Synthesizer::new_with_initialize(
            ModelFileSet::new(SAMPLE_METAS_JSON.to_string(), vec![]),
            InitializeOptions {
                acceleration_mode: AccelerationMode::Cpu,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn test_query() -> AudioQueryModel {
        AudioQueryModel {
            accent_phrases: vec![AccentPhraseModel {
                moras: vec![MoraModel {
                    text: "テ".to_string(),
                    consonant: Some("t".to_string()),
                    consonant_length: Some(0.05),
                    vowel: "e".to_string(),
                    vowel_length: 0.1,
                    pitch: 5.5,
                }],
                accent: 1,
                pause_mora: None,
                is_interrogative: false,
            }],
            speed_scale: 1.,
            pitch_scale: 0.,
            intonation_scale: 1.,
            volume_scale: 1.,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate: 24000,
            output_stereo: false,
            kana: String::new(),
        }
    }

    #[test]
    fn get_version_works() {
        assert_eq!("0.1.0", Synthesizer::get_version());
    }

    #[test]
    fn metas_json_is_available_before_initialize() {
        let synthesizer = synthesizer();
        assert_eq!(SAMPLE_METAS_JSON, synthesizer.get_metas_json());
        assert!(matches!(
            synthesizer.metas(),
            Err(Error::UninitializedStatus)
        ));
    }

    #[test]
    fn initialize_and_finalize_work() {
        let mut synthesizer = synthesizer();
        assert!(!synthesizer.is_gpu_mode());
        synthesizer
            .initialize(InitializeOptions {
                acceleration_mode: AccelerationMode::Cpu,
                ..Default::default()
            })
            .unwrap();
        assert!(!synthesizer.is_gpu_mode());
        assert_eq!(2, synthesizer.metas().unwrap().len());
        synthesizer.finalize();
        assert!(matches!(
            synthesizer.metas(),
            Err(Error::UninitializedStatus)
        ));
    }

    #[cfg(not(any(feature = "cuda", feature = "directml")))]
    #[test]
    fn gpu_initialize_on_cpu_only_build_fails() {
        let mut synthesizer = synthesizer();
        let result = synthesizer.initialize(InitializeOptions {
            acceleration_mode: AccelerationMode::Gpu,
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::GpuSupport)));
    }

    #[test]
    fn accent_phrases_from_text_requires_dict() {
        let synthesizer = initialized_synthesizer();
        let result = synthesizer.accent_phrases(
            "こんにちは",
            StyleId::new(0),
            AccentPhrasesOptions { kana: false },
        );
        assert!(matches!(result, Err(Error::NotLoadedOpenjtalkDict)));
    }

    #[test]
    fn audio_query_from_kana_before_initialize_fails() {
        let synthesizer = synthesizer();
        let result = synthesizer.audio_query(
            "テ'スト",
            StyleId::new(0),
            AudioQueryOptions { kana: true },
        );
        assert!(matches!(result, Err(Error::UninitializedStatus)));
    }

    #[test]
    fn audio_query_from_broken_kana_fails() {
        let synthesizer = initialized_synthesizer();
        let result = synthesizer.audio_query(
            "'アクセント",
            StyleId::new(0),
            AudioQueryOptions { kana: true },
        );
        assert!(matches!(result, Err(Error::ParseKana(_))));
    }

    #[test]
    fn unknown_style_is_rejected_without_model_access() {
        let synthesizer = initialized_synthesizer();
        let result = synthesizer.synthesis(&test_query(), StyleId::new(999), Default::default());
        assert!(
            matches!(result, Err(Error::StyleNotFound { style_id }) if style_id == StyleId::new(999))
        );
    }

    #[test]
    fn known_style_without_model_is_model_not_loaded() {
        let synthesizer = initialized_synthesizer();
        let result = synthesizer.synthesis(&test_query(), StyleId::new(0), Default::default());
        assert!(matches!(result, Err(Error::ModelNotLoaded { model_index: 0 })));
    }

    #[test]
    fn synthesis_validates_audio_query() {
        let synthesizer = initialized_synthesizer();
        let mut query = test_query();
        query.accent_phrases[0].accent = 2;
        let result = synthesizer.synthesis(&query, StyleId::new(0), Default::default());
        assert!(matches!(result, Err(Error::InvalidAccentPhrase { .. })));
    }

    #[test]
    fn mora_data_validates_accent_phrases() {
        let synthesizer = initialized_synthesizer();
        let phrases = vec![AccentPhraseModel {
            moras: vec![],
            accent: 1,
            pause_mora: None,
            is_interrogative: false,
        }];
        let result = synthesizer.mora_data(&phrases, StyleId::new(0));
        assert!(matches!(result, Err(Error::InvalidAccentPhrase { .. })));
    }

    #[test]
    fn tts_with_unknown_style_fails_with_style_not_found() {
        let synthesizer = initialized_synthesizer();
        let result = synthesizer.tts(
            "テ'スト",
            StyleId::new(999),
            TtsOptions {
                kana: true,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::StyleNotFound { .. })));
    }

    #[test]
    fn load_model_validates_style() {
        let synthesizer = initialized_synthesizer();
        assert!(matches!(
            synthesizer.load_model(StyleId::new(999)),
            Err(Error::StyleNotFound { .. })
        ));
        // スタイル3はモデル0に振り分けられるが、モデルファイルが無いので読み込めない。
        assert!(matches!(
            synthesizer.load_model(StyleId::new(3)),
            Err(Error::ModelNotLoaded { model_index: 0 })
        ));
        assert!(!synthesizer.is_model_loaded(StyleId::new(3)));
    }

    #[test]
    fn low_level_operations_require_initialize() {
        let synthesizer = synthesizer();
        assert!(matches!(
            synthesizer.predict_duration(&[0], StyleId::new(0)),
            Err(Error::UninitializedStatus)
        ));
        assert!(matches!(
            synthesizer.predict_intonation(
                2,
                &[0, 0],
                &[-1, -1],
                &[0, 0],
                &[0, 0],
                &[0, 0],
                &[0, 0],
                StyleId::new(0),
            ),
            Err(Error::UninitializedStatus)
        ));
        assert!(matches!(
            synthesizer.decode(1, 45, &[0.], &[0.; 45], StyleId::new(0)),
            Err(Error::UninitializedStatus)
        ));
        assert!(matches!(
            synthesizer.load_model(StyleId::new(0)),
            Err(Error::UninitializedStatus)
        ));
    }

    #[rstest]
    fn default_options_are_conservative() {
        assert!(!TtsOptions::default().kana);
        assert!(TtsOptions::default().enable_interrogative_upspeak);
        assert!(SynthesisOptions::default().enable_interrogative_upspeak);
        assert!(!AudioQueryOptions::default().kana);
        assert_eq!(AccelerationMode::Auto, AccelerationMode::default());
        assert_eq!(0, InitializeOptions::default().cpu_num_threads);
    }
}
