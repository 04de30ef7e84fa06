use thiserror::Error;

use crate::engine::{FullContextLabelError, KanaParseError};
use crate::metas::StyleId;
use crate::result_code::{error_result_to_message, ResultCode};

/*
 * 新しいエラーを定義したら、必ずresult_code.rsにあるResultCodeへ対応するコードを定義し、
 * 下のFrom実装へ変換処理を加えること
 */

/// このライブラリのエラーの全集合。
#[derive(Error, Debug)]
pub enum Error {
    /*
     * エラーメッセージのベースとなる文字列は必ずbase_error_message関数を使用して
     * ResultCodeのエラー出力の内容と対応するようにすること
     */
    #[error("{}", base_error_message(ResultCode::NotLoadedOpenjtalkDictError))]
    NotLoadedOpenjtalkDict,

    #[error("{}", base_error_message(ResultCode::GpuSupportError))]
    GpuSupport,

    #[error("{},{0}", base_error_message(ResultCode::LoadModelError))]
    LoadModel(#[source] anyhow::Error),

    #[error("{},{0}", base_error_message(ResultCode::LoadMetasError))]
    LoadMetas(#[source] anyhow::Error),

    #[error("{},{0}", base_error_message(ResultCode::GetSupportedDevicesError))]
    GetSupportedDevices(#[source] anyhow::Error),

    #[error("{}", base_error_message(ResultCode::UninitializedStatusError))]
    UninitializedStatus,

    #[error("{}: {style_id}", base_error_message(ResultCode::StyleNotFoundError))]
    StyleNotFound { style_id: StyleId },

    #[error("{}: {model_index}", base_error_message(ResultCode::ModelNotFoundError))]
    ModelNotLoaded { model_index: usize },

    #[error("{},{0}", base_error_message(ResultCode::RunModelError))]
    InferenceFailed(#[source] anyhow::Error),

    #[error("{},{0}", base_error_message(ResultCode::AnalyzeTextError))]
    ExtractFullContextLabel(#[from] FullContextLabelError),

    #[error("{},{0}", base_error_message(ResultCode::ParseKanaError))]
    ParseKana(#[from] KanaParseError),

    #[error("{}: {context}", base_error_message(ResultCode::InvalidAudioQueryError))]
    InvalidAudioQuery { context: String },

    #[error("{}: {context}", base_error_message(ResultCode::InvalidAccentPhraseError))]
    InvalidAccentPhrase { context: String },

    #[error("{}: {context}", base_error_message(ResultCode::InvalidMoraError))]
    InvalidMora { context: String },
}

impl From<&Error> for ResultCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotLoadedOpenjtalkDict => ResultCode::NotLoadedOpenjtalkDictError,
            Error::GpuSupport => ResultCode::GpuSupportError,
            Error::LoadModel(_) => ResultCode::LoadModelError,
            Error::LoadMetas(_) => ResultCode::LoadMetasError,
            Error::GetSupportedDevices(_) => ResultCode::GetSupportedDevicesError,
            Error::UninitializedStatus => ResultCode::UninitializedStatusError,
            Error::StyleNotFound { .. } => ResultCode::StyleNotFoundError,
            Error::ModelNotLoaded { .. } => ResultCode::ModelNotFoundError,
            Error::InferenceFailed(_) => ResultCode::RunModelError,
            Error::ExtractFullContextLabel(_) => ResultCode::AnalyzeTextError,
            Error::ParseKana(_) => ResultCode::ParseKanaError,
            Error::InvalidAudioQuery { .. } => ResultCode::InvalidAudioQueryError,
            Error::InvalidAccentPhrase { .. } => ResultCode::InvalidAccentPhraseError,
            Error::InvalidMora { .. } => ResultCode::InvalidMoraError,
        }
    }
}

fn base_error_message(result_code: ResultCode) -> &'static str {
    let c_message: &'static str = error_result_to_message(result_code);
    &c_message[..(c_message.len() - 1)]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Error, ResultCode};
    use crate::engine::KanaParseError;
    use crate::metas::StyleId;

    #[rstest]
    #[case(Error::NotLoadedOpenjtalkDict, ResultCode::NotLoadedOpenjtalkDictError)]
    #[case(Error::GpuSupport, ResultCode::GpuSupportError)]
    #[case(Error::UninitializedStatus, ResultCode::UninitializedStatusError)]
    #[case(
        Error::StyleNotFound { style_id: StyleId::new(9) },
        ResultCode::StyleNotFoundError
    )]
    #[case(Error::ModelNotLoaded { model_index: 1 }, ResultCode::ModelNotFoundError)]
    #[case(
        Error::InferenceFailed(anyhow::anyhow!("session error")),
        ResultCode::RunModelError
    )]
    #[case(
        Error::ParseKana(KanaParseError::EmptyPhrase { position: 0 }),
        ResultCode::ParseKanaError
    )]
    #[case(
        Error::InvalidAudioQuery { context: "x".into() },
        ResultCode::InvalidAudioQueryError
    )]
    fn error_maps_to_result_code(#[case] error: Error, #[case] expected: ResultCode) {
        assert_eq!(expected, ResultCode::from(&error));
    }

    #[test]
    fn display_has_no_nul() {
        let message = Error::StyleNotFound {
            style_id: StyleId::new(999),
        }
        .to_string();
        assert!(!message.contains('\0'), "{message:?}");
        assert!(message.contains("999"), "{message:?}");
    }

    #[test]
    fn wrapped_error_keeps_source() {
        use std::error::Error as _;
        let error = Error::InferenceFailed(anyhow::anyhow!("ort session failed"));
        assert!(error.source().is_some());
        assert!(error.to_string().contains("ort session failed"));
    }
}
