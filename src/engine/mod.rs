mod acoustic_feature_extractor;
mod audio_file;
mod full_context_label;
mod kana_parser;
mod model;
mod mora_list;
mod open_jtalk;
mod synthesis_engine;

pub use self::acoustic_feature_extractor::{phoneme_symbol, OjtPhoneme};
pub use self::audio_file::wav_from_s16le;
pub use self::full_context_label::FullContextLabelError;
pub use self::kana_parser::{create_kana, parse_kana, KanaParseError};
pub use self::model::{AccentPhraseModel, AudioQueryModel, MoraModel};
pub(crate) use self::model::validate_accent_phrases;
pub use self::open_jtalk::OpenJtalk;
pub(crate) use self::synthesis_engine::SynthesisEngine;

/// 音響モデルが前提とするサンプリングレート。
pub const DEFAULT_SAMPLING_RATE: u32 = 24000;
