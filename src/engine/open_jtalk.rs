use std::path::{Path, PathBuf};

use anyhow::Context as _;
use jpreprocess::{DefaultFetcher, JPreprocess, JPreprocessConfig, SystemDictionaryConfig};

/// 日本語テキストからフルコンテキストラベルを抽出する解析器の契約。
/// ラベルの中身には関知せず、1音素1行の文字列列として受け取る。
pub(crate) trait FullcontextExtractor {
    fn extract_fullcontext(&self, text: &str) -> anyhow::Result<Vec<String>>;
}

/// jpreprocessを用いた解析器。辞書はディレクトリパスで受け取り、一度だけ構築する。
pub struct OpenJtalk {
    analyzer: Option<JPreprocess<DefaultFetcher>>,
}

impl OpenJtalk {
    pub fn initialize() -> Self {
        Self { analyzer: None }
    }

    pub fn load(&mut self, mecab_dict_dir: impl AsRef<Path>) -> anyhow::Result<()> {
        let config = JPreprocessConfig {
            dictionary: SystemDictionaryConfig::File(PathBuf::from(mecab_dict_dir.as_ref())),
            user_dictionary: None,
        };
        self.analyzer = Some(JPreprocess::from_config(config)?);
        Ok(())
    }

    pub fn dict_loaded(&self) -> bool {
        self.analyzer.is_some()
    }
}

impl FullcontextExtractor for OpenJtalk {
    fn extract_fullcontext(&self, text: &str) -> anyhow::Result<Vec<String>> {
        let analyzer = self
            .analyzer
            .as_ref()
            .context("辞書が読み込まれていません")?;
        Ok(analyzer.extract_fullcontext(text)?)
    }
}
