use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::open_jtalk::FullcontextExtractor;

#[derive(thiserror::Error, Debug)]
#[error("入力テキストからのフルコンテキストラベル抽出に失敗しました: {context}")]
pub struct FullContextLabelError {
    context: ErrorKind,
    #[source]
    source: Option<anyhow::Error>,
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("OpenJTalkで解釈することができませんでした")]
    OpenJtalk,

    #[error("label parse error label: {label}")]
    LabelParse { label: String },

    #[error("too long mora mora_phonemes: {mora_phonemes:?}")]
    TooLongMora { mora_phonemes: Vec<Phoneme> },

    #[error("invalid mora: {mora:?}")]
    InvalidMora { mora: Box<Mora> },

    #[error("accent phrase is empty")]
    EmptyAccentPhrase,
}

type Result<T> = std::result::Result<T, FullContextLabelError>;

/// フルコンテキストラベル1行から正規表現で取り出したコンテキストの束。
#[derive(Clone, PartialEq, Debug)]
pub struct Phoneme {
    contexts: HashMap<String, String>,
    label: String,
}

static P3_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\-(.*?)\+)").unwrap());
static A2_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\+(\d+|xx)\+)").unwrap());
static A3_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\+(\d+|xx)/B:)").unwrap());
static F1_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(/F:(\d+|xx)_)").unwrap());
static F2_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(_(\d+|xx)\#)").unwrap());
static F3_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\#(\d+|xx)_)").unwrap());
static F5_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(@(\d+|xx)_)").unwrap());
static H1_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(/H:(\d+|xx)_)").unwrap());
static I3_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(@(\d+|xx)\+)").unwrap());
static J1_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(/J:(\d+|xx)_)").unwrap());

fn string_feature_by_regex(re: &Regex, label: &str) -> std::result::Result<String, ErrorKind> {
    if let Some(caps) = re.captures(label) {
        Ok(caps.get(2).unwrap().as_str().to_string())
    } else {
        Err(ErrorKind::LabelParse {
            label: label.into(),
        })
    }
}

impl Phoneme {
    fn from_label(label: impl Into<String>) -> std::result::Result<Self, ErrorKind> {
        let mut contexts = HashMap::<String, String>::with_capacity(10);
        let label = label.into();
        contexts.insert("p3".into(), string_feature_by_regex(&P3_REGEX, &label)?);
        contexts.insert("a2".into(), string_feature_by_regex(&A2_REGEX, &label)?);
        contexts.insert("a3".into(), string_feature_by_regex(&A3_REGEX, &label)?);
        contexts.insert("f1".into(), string_feature_by_regex(&F1_REGEX, &label)?);
        contexts.insert("f2".into(), string_feature_by_regex(&F2_REGEX, &label)?);
        contexts.insert("f3".into(), string_feature_by_regex(&F3_REGEX, &label)?);
        contexts.insert("f5".into(), string_feature_by_regex(&F5_REGEX, &label)?);
        contexts.insert("h1".into(), string_feature_by_regex(&H1_REGEX, &label)?);
        contexts.insert("i3".into(), string_feature_by_regex(&I3_REGEX, &label)?);
        contexts.insert("j1".into(), string_feature_by_regex(&J1_REGEX, &label)?);

        Ok(Self { contexts, label })
    }

    fn context(&self, key: &str) -> &str {
        self.contexts.get(key).unwrap().as_str()
    }

    pub fn phoneme(&self) -> &str {
        self.context("p3")
    }

    pub fn is_pause(&self) -> bool {
        self.context("f1") == "xx"
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Mora {
    pub consonant: Option<Phoneme>,
    pub vowel: Phoneme,
}

impl Mora {
    pub fn phonemes(&self) -> Vec<Phoneme> {
        if let Some(consonant) = &self.consonant {
            vec![consonant.clone(), self.vowel.clone()]
        } else {
            vec![self.vowel.clone()]
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct AccentPhrase {
    pub moras: Vec<Mora>,
    pub accent: usize,
    pub is_interrogative: bool,
}

impl AccentPhrase {
    fn from_phonemes(phonemes: Vec<Phoneme>) -> std::result::Result<Self, ErrorKind> {
        let mut moras = Vec::with_capacity(phonemes.len());
        let mut mora_phonemes = Vec::with_capacity(phonemes.len());
        for i in 0..phonemes.len() {
            // `a2 == 49`はアクセント句終端を示す上流のワークアラウンド。
            if phonemes[i].context("a2") == "49" {
                break;
            }
            mora_phonemes.push(phonemes[i].clone());

            if i + 1 == phonemes.len()
                || phonemes[i].context("a2") != phonemes[i + 1].context("a2")
            {
                match <[Phoneme; 1]>::try_from(mora_phonemes.clone()) {
                    Ok([vowel]) => moras.push(Mora {
                        consonant: None,
                        vowel,
                    }),
                    Err(_) => match <[Phoneme; 2]>::try_from(mora_phonemes.clone()) {
                        Ok([consonant, vowel]) => moras.push(Mora {
                            consonant: Some(consonant),
                            vowel,
                        }),
                        Err(mora_phonemes) => {
                            return Err(ErrorKind::TooLongMora { mora_phonemes })
                        }
                    },
                }
                mora_phonemes.clear();
            }
        }

        let mora = moras.first().ok_or(ErrorKind::EmptyAccentPhrase)?;
        let mut accent: usize =
            mora.vowel
                .context("f2")
                .parse()
                .map_err(|_| ErrorKind::InvalidMora {
                    mora: mora.clone().into(),
                })?;

        let is_interrogative = moras
            .last()
            .expect("non-empty by the check above")
            .vowel
            .context("f3")
            == "1";
        // アクセント位置がモーラ数を超えるラベルが来ることがあるため丸める。
        if accent > moras.len() {
            accent = moras.len();
        }

        Ok(Self {
            moras,
            accent,
            is_interrogative,
        })
    }

    pub fn phonemes(&self) -> Vec<Phoneme> {
        self.moras.iter().flat_map(Mora::phonemes).collect()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct BreathGroup {
    pub accent_phrases: Vec<AccentPhrase>,
}

impl BreathGroup {
    fn from_phonemes(phonemes: Vec<Phoneme>) -> std::result::Result<Self, ErrorKind> {
        let mut accent_phrases = Vec::with_capacity(phonemes.len());
        let mut accent_phonemes = Vec::with_capacity(phonemes.len());
        for i in 0..phonemes.len() {
            accent_phonemes.push(phonemes[i].clone());
            if i + 1 == phonemes.len()
                || phonemes[i].context("i3") != phonemes[i + 1].context("i3")
                || phonemes[i].context("f5") != phonemes[i + 1].context("f5")
            {
                accent_phrases.push(AccentPhrase::from_phonemes(accent_phonemes.clone())?);
                accent_phonemes.clear();
            }
        }

        Ok(Self { accent_phrases })
    }

    pub fn phonemes(&self) -> Vec<Phoneme> {
        self.accent_phrases
            .iter()
            .flat_map(AccentPhrase::phonemes)
            .collect()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Utterance {
    pub breath_groups: Vec<BreathGroup>,
    pub pauses: Vec<Phoneme>,
}

impl Utterance {
    fn from_phonemes(phonemes: Vec<Phoneme>) -> std::result::Result<Self, ErrorKind> {
        let mut breath_groups = vec![];
        let mut group_phonemes = Vec::with_capacity(phonemes.len());
        let mut pauses = vec![];
        for phoneme in phonemes {
            if !phoneme.is_pause() {
                group_phonemes.push(phoneme);
            } else {
                pauses.push(phoneme);

                if !group_phonemes.is_empty() {
                    breath_groups.push(BreathGroup::from_phonemes(group_phonemes.clone())?);
                    group_phonemes.clear();
                }
            }
        }
        Ok(Self {
            breath_groups,
            pauses,
        })
    }

    pub(crate) fn extract_full_context_label(
        analyzer: &impl FullcontextExtractor,
        text: &str,
    ) -> Result<Self> {
        let labels = analyzer
            .extract_fullcontext(text)
            .map_err(|source| FullContextLabelError {
                context: ErrorKind::OpenJtalk,
                source: Some(source),
            })?;

        labels
            .into_iter()
            .map(Phoneme::from_label)
            .collect::<std::result::Result<Vec<_>, _>>()
            .and_then(Self::from_phonemes)
            .map_err(|context| FullContextLabelError {
                context,
                source: None,
            })
    }
}
