use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 音素の一覧。並び順が音素IDそのもの。モデルのテンソルはこのIDで音素を参照する。
const PHONEME_LIST: &[&str] = &[
    "pau", "A", "E", "I", "N", "O", "U", "a", "b", "by", "ch", "cl", "d", "dy", "e", "f", "g",
    "gw", "gy", "h", "hy", "i", "j", "k", "kw", "ky", "m", "my", "n", "ny", "o", "p", "py", "r",
    "ry", "s", "sh", "t", "ts", "ty", "u", "v", "w", "y", "z",
];

static PHONEME_MAP: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    PHONEME_LIST
        .iter()
        .enumerate()
        .map(|(i, s)| (*s, i as i64))
        .collect()
});

/// モーラを構成できる音素(母音・撥音・促音・無音)。
pub(crate) const MORA_PHONEME_LIST: &[&str] = &[
    "a", "i", "u", "e", "o", "N", "A", "I", "U", "E", "O", "cl", "pau",
];

/// 無声化している、あるいは無音扱いの音素。ピッチを持たない。
pub(crate) const UNVOICED_MORA_PHONEME_LIST: &[&str] = &["A", "I", "U", "E", "O", "cl", "pau"];

/// OpenJTalkの音素表記を1つ保持する。
#[derive(Clone, PartialEq, Default, Debug)]
pub struct OjtPhoneme {
    pub phoneme: String,
}

impl OjtPhoneme {
    pub fn new(phoneme: impl Into<String>) -> Self {
        Self {
            phoneme: phoneme.into(),
        }
    }

    pub fn num_phoneme() -> usize {
        PHONEME_LIST.len()
    }

    pub fn space_phoneme() -> String {
        "pau".to_string()
    }

    /// 音素ID。空文字列は子音なしを表す`-1`。
    /// 未知の音素はテーブル構築時に排除されている前提でパニックする。
    pub fn phoneme_id(&self) -> i64 {
        if self.phoneme.is_empty() {
            -1
        } else {
            *PHONEME_MAP.get(&*self.phoneme).unwrap()
        }
    }

    pub fn is_mora_phoneme(&self) -> bool {
        MORA_PHONEME_LIST.iter().any(|p| *p == self.phoneme)
    }

    pub fn is_unvoiced_mora_phoneme(&self) -> bool {
        UNVOICED_MORA_PHONEME_LIST.iter().any(|p| *p == self.phoneme)
    }

    /// ラベル抽出器が先頭と末尾に付ける`sil`をモデル語彙の`pau`へ置き換える。
    pub fn convert(phonemes: &[OjtPhoneme]) -> Vec<OjtPhoneme> {
        let mut phonemes = phonemes.to_owned();
        if let Some(first) = phonemes.first_mut() {
            if first.phoneme.contains("sil") {
                first.phoneme = Self::space_phoneme();
            }
        }
        if let Some(last) = phonemes.last_mut() {
            if last.phoneme.contains("sil") {
                last.phoneme = Self::space_phoneme();
            }
        }
        phonemes
    }
}

pub(crate) fn is_known_phoneme(symbol: &str) -> bool {
    PHONEME_MAP.contains_key(symbol)
}

/// IDから音素表記への逆引き。
pub fn phoneme_symbol(phoneme_id: i64) -> Option<&'static str> {
    usize::try_from(phoneme_id)
        .ok()
        .and_then(|i| PHONEME_LIST.get(i).copied())
}
