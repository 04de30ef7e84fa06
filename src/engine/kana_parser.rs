use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::model::{AccentPhraseModel, MoraModel};
use super::mora_list::MORA_LIST_MINIMUM;

const UNVOICE_SYMBOL: char = '_';
const ACCENT_SYMBOL: char = '\'';
const NOPAUSE_DELIMITER: char = '/';
const PAUSE_DELIMITER: char = '、';
const WIDE_INTERROGATION_MARK: char = '？';
const LOOP_LIMIT: usize = 300;

/// AquesTalk風記法のパース失敗。規則ごとに区別する。
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KanaParseError {
    #[error("accent cannot be set at beginning of accent phrase: {phrase}")]
    AccentAtBeginning { phrase: String },

    #[error("second accent cannot be set at an accent phrase: {phrase}")]
    DuplicateAccent { phrase: String },

    #[error("accent not found in accent phrase: {phrase}")]
    AccentNotFound { phrase: String },

    #[error("interrogative mark cannot be set at not end of accent phrase: {phrase}")]
    InterrogativeNotAtEnd { phrase: String },

    #[error("unknown text in accent phrase: {phrase}")]
    UnknownText { phrase: String },

    #[error("accent phrase at position of {position} is empty")]
    EmptyPhrase { position: usize },

    #[error("detected infinity loop!")]
    InfiniteLoop,
}

type KanaParseResult<T> = std::result::Result<T, KanaParseError>;

static TEXT2MORA_WITH_UNVOICE: Lazy<HashMap<String, MoraModel>> = Lazy::new(|| {
    let mut text2mora_with_unvoice = HashMap::new();
    for [text, consonant, vowel] in MORA_LIST_MINIMUM {
        let consonant = (!consonant.is_empty()).then(|| consonant.to_string());
        let consonant_length = consonant.is_some().then_some(0.0);

        if ["a", "i", "u", "e", "o"].contains(&vowel) {
            // 無声化モーラは`_`付きで引けるようにし、母音を大文字にする。
            let upper_vowel = vowel.to_uppercase();
            let unvoice_mora = MoraModel {
                text: text.to_string(),
                consonant: consonant.clone(),
                consonant_length,
                vowel: upper_vowel,
                vowel_length: 0.,
                pitch: 0.,
            };
            text2mora_with_unvoice.insert(UNVOICE_SYMBOL.to_string() + text, unvoice_mora);
        }

        let mora = MoraModel {
            text: text.to_string(),
            consonant,
            consonant_length,
            vowel: vowel.to_string(),
            vowel_length: 0.,
            pitch: 0.,
        };
        text2mora_with_unvoice.insert(text.to_string(), mora);
    }
    text2mora_with_unvoice
});

fn text_to_accent_phrase(phrase: &str) -> KanaParseResult<AccentPhraseModel> {
    let phrase_vec: Vec<char> = phrase.chars().collect();
    let mut accent_index: Option<usize> = None;
    let mut moras: Vec<MoraModel> = Vec::new();
    let mut stack = String::new();
    let mut matched_text: Option<String> = None;
    let text2mora = &TEXT2MORA_WITH_UNVOICE;
    let mut index = 0;
    let mut loop_count = 0;
    while index < phrase_vec.len() {
        loop_count += 1;
        let letter = phrase_vec[index];
        if letter == ACCENT_SYMBOL {
            if index == 0 {
                return Err(KanaParseError::AccentAtBeginning {
                    phrase: phrase.to_string(),
                });
            }
            if accent_index.is_some() {
                return Err(KanaParseError::DuplicateAccent {
                    phrase: phrase.to_string(),
                });
            }
            accent_index = Some(moras.len());
            index += 1;
            continue;
        }

        // 最長一致でモーラを切り出す。
        for &watch_letter in &phrase_vec[index..] {
            if watch_letter == ACCENT_SYMBOL {
                break;
            }
            stack.push(watch_letter);
            if text2mora.contains_key(&stack) {
                matched_text = Some(stack.clone());
            }
        }
        if let Some(matched_text) = matched_text.take() {
            index += matched_text.chars().count();
            moras.push(text2mora[&matched_text].clone());
            stack.clear();
        } else {
            return Err(KanaParseError::UnknownText {
                phrase: phrase.to_string(),
            });
        }
        if loop_count > LOOP_LIMIT {
            return Err(KanaParseError::InfiniteLoop);
        }
    }
    let accent = accent_index.ok_or_else(|| KanaParseError::AccentNotFound {
        phrase: phrase.to_string(),
    })?;
    Ok(AccentPhraseModel {
        moras,
        accent,
        pause_mora: None,
        is_interrogative: false,
    })
}

/// AquesTalk風記法のテキストをアクセント句の列へパースする。
pub fn parse_kana(text: &str) -> KanaParseResult<Vec<AccentPhraseModel>> {
    const TERMINATOR: char = '\0';
    let mut parsed_result = Vec::new();
    let chars_of_text = text.chars().chain([TERMINATOR]);
    let mut phrase = String::new();
    for letter in chars_of_text {
        if letter == TERMINATOR || letter == PAUSE_DELIMITER || letter == NOPAUSE_DELIMITER {
            if phrase.is_empty() {
                return Err(KanaParseError::EmptyPhrase {
                    position: parsed_result.len(),
                });
            }
            let is_interrogative = phrase.contains(WIDE_INTERROGATION_MARK);
            if is_interrogative {
                if phrase.find(WIDE_INTERROGATION_MARK).unwrap()
                    != phrase.len() - WIDE_INTERROGATION_MARK.len_utf8()
                {
                    return Err(KanaParseError::InterrogativeNotAtEnd {
                        phrase: phrase.clone(),
                    });
                }
                phrase.pop(); // remove WIDE_INTERROGATION_MARK
            }
            let accent_phrase = {
                let mut accent_phrase = text_to_accent_phrase(&phrase)?;
                if letter == PAUSE_DELIMITER {
                    accent_phrase.pause_mora = Some(MoraModel {
                        text: PAUSE_DELIMITER.to_string(),
                        consonant: None,
                        consonant_length: None,
                        vowel: "pau".to_string(),
                        vowel_length: 0.,
                        pitch: 0.,
                    });
                }
                accent_phrase.is_interrogative = is_interrogative;
                accent_phrase
            };
            parsed_result.push(accent_phrase);
            phrase.clear();
        } else {
            phrase.push(letter);
        }
    }
    Ok(parsed_result)
}

/// アクセント句の列をAquesTalk風記法のテキストへ書き戻す。`parse_kana`の逆変換。
pub fn create_kana(accent_phrases: &[AccentPhraseModel]) -> String {
    let mut text = String::new();
    for phrase in accent_phrases {
        for (index, mora) in phrase.moras.iter().enumerate() {
            if ["A", "E", "I", "O", "U"].contains(&&*mora.vowel) {
                text.push(UNVOICE_SYMBOL);
            }
            text.push_str(&mora.text);
            if index + 1 == phrase.accent {
                text.push(ACCENT_SYMBOL);
            }
        }
        if phrase.is_interrogative {
            text.push(WIDE_INTERROGATION_MARK);
        }
        text.push(if phrase.pause_mora.is_some() {
            PAUSE_DELIMITER
        } else {
            NOPAUSE_DELIMITER
        });
    }
    text.pop(); // remove last delimiter
    text
}
