/// 処理結果を示す結果コード。C ABI境界ではこの値が`int32`としてそのまま渡る。
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultCode {
    /// 成功
    Ok = 0,
    /// OpenJTalk辞書ファイルが読み込まれていない
    NotLoadedOpenjtalkDictError = 1,
    /// modelの読み込みに失敗した
    LoadModelError = 2,
    /// サポートされているデバイス情報取得に失敗した
    GetSupportedDevicesError = 3,
    /// GPUモードがサポートされていない
    GpuSupportError = 4,
    /// メタ情報読み込みに失敗した
    LoadMetasError = 5,
    /// ステータスが初期化されていない
    UninitializedStatusError = 6,
    /// 無効なstyle_idが指定された
    StyleNotFoundError = 7,
    /// 無効なmodel_indexが指定された
    ModelNotFoundError = 8,
    /// 推論に失敗した
    RunModelError = 9,
    /// コンテキストラベル出力に失敗した
    AnalyzeTextError = 10,
    /// 無効なutf8文字列が入力された
    InvalidUtf8InputError = 11,
    /// AquesTalk風記法のテキストの解析に失敗した
    ParseKanaError = 12,
    /// 無効なAudioQuery
    InvalidAudioQueryError = 13,
    /// 無効なAccentPhrase
    InvalidAccentPhraseError = 14,
    /// 無効なMora
    InvalidMoraError = 15,
}

/// 結果コードに対応するメッセージ。
/// C APIのため、messageには必ず末尾にNULL文字を追加する。
pub const fn error_result_to_message(result_code: ResultCode) -> &'static str {
    use ResultCode::*;
    match result_code {
        Ok => "エラーが発生しませんでした\0",
        NotLoadedOpenjtalkDictError => "OpenJTalkの辞書が読み込まれていません\0",
        LoadModelError => "modelデータ読み込みに失敗しました\0",
        GetSupportedDevicesError => {
            "サポートされているデバイス情報取得中にエラーが発生しました\0"
        }
        GpuSupportError => "GPU機能をサポートすることができません\0",
        LoadMetasError => "メタデータ読み込みに失敗しました\0",
        UninitializedStatusError => "Statusが初期化されていません\0",
        StyleNotFoundError => "無効なstyle_idです\0",
        ModelNotFoundError => "無効なmodel_indexです\0",
        RunModelError => "推論に失敗しました\0",
        AnalyzeTextError => {
            "入力テキストからのフルコンテキストラベル抽出に失敗しました\0"
        }
        InvalidUtf8InputError => "入力テキストが無効なUTF-8データでした\0",
        ParseKanaError => {
            "入力テキストをAquesTalk風記法としてパースすることに失敗しました\0"
        }
        InvalidAudioQueryError => "無効なaudio_queryです\0",
        InvalidAccentPhraseError => "無効なaccent_phraseです\0",
        InvalidMoraError => "無効なmoraです\0",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{error_result_to_message, ResultCode};

    #[rstest]
    #[case(ResultCode::Ok)]
    #[case(ResultCode::NotLoadedOpenjtalkDictError)]
    #[case(ResultCode::LoadModelError)]
    #[case(ResultCode::GetSupportedDevicesError)]
    #[case(ResultCode::GpuSupportError)]
    #[case(ResultCode::LoadMetasError)]
    #[case(ResultCode::UninitializedStatusError)]
    #[case(ResultCode::StyleNotFoundError)]
    #[case(ResultCode::ModelNotFoundError)]
    #[case(ResultCode::RunModelError)]
    #[case(ResultCode::AnalyzeTextError)]
    #[case(ResultCode::InvalidUtf8InputError)]
    #[case(ResultCode::ParseKanaError)]
    #[case(ResultCode::InvalidAudioQueryError)]
    #[case(ResultCode::InvalidAccentPhraseError)]
    #[case(ResultCode::InvalidMoraError)]
    fn every_message_is_nul_terminated(#[case] result_code: ResultCode) {
        let message = error_result_to_message(result_code);
        assert!(message.ends_with('\0'));
        assert_eq!(1, message.matches('\0').count());
    }

    #[test]
    fn ok_is_zero() {
        assert_eq!(0, ResultCode::Ok as i32);
    }
}
