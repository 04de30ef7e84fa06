//! 日本語テキストあるいはAquesTalk風記法から音声波形を合成する、
//! 音声合成エンジンの推論・言語処理コア。
//!
//! テキストはOpenJTalk形式のフルコンテキストラベルを経てアクセント句構造へ解析され、
//! 音素長・モーラ音高・波形の3つのモデルを順に通してWAVになる。

mod devices;
mod engine;
mod error;
mod inference_core;
mod metas;
mod model_file;
mod result_code;
mod status;
mod synthesizer;

#[cfg(test)]
mod test_util;

pub use devices::SupportedDevices;
pub use engine::{
    create_kana, parse_kana, phoneme_symbol, wav_from_s16le, AccentPhraseModel, AudioQueryModel,
    FullContextLabelError, KanaParseError, MoraModel, OjtPhoneme, DEFAULT_SAMPLING_RATE,
};
pub use error::Error;
pub use metas::{RawStyleId, SpeakerMeta, StyleId, StyleMeta, VoiceModelMeta};
pub use model_file::{ModelFile, ModelFileSet};
pub use result_code::{error_result_to_message, ResultCode};
pub use synthesizer::{
    AccelerationMode, AccentPhrasesOptions, AudioQueryOptions, InitializeOptions, Synthesizer,
    SynthesisOptions, TtsOptions,
};

pub type Result<T> = std::result::Result<T, Error>;
