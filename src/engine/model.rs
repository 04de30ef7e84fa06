use serde::{Deserialize, Serialize};

use super::acoustic_feature_extractor::{is_known_phoneme, OjtPhoneme};
use crate::{Error, Result};

/// モーラ(子音+母音)ごとの情報。
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MoraModel {
    pub text: String,
    pub consonant: Option<String>,
    pub consonant_length: Option<f32>,
    pub vowel: String,
    pub vowel_length: f32,
    pub pitch: f32,
}

/// アクセント句ごとの情報。
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AccentPhraseModel {
    pub moras: Vec<MoraModel>,
    pub accent: usize,
    pub pause_mora: Option<MoraModel>,
    pub is_interrogative: bool,
}

/// 音声合成用のクエリ。
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AudioQueryModel {
    pub accent_phrases: Vec<AccentPhraseModel>,
    pub speed_scale: f32,
    pub pitch_scale: f32,
    pub intonation_scale: f32,
    pub volume_scale: f32,
    pub pre_phoneme_length: f32,
    pub post_phoneme_length: f32,
    pub output_sampling_rate: u32,
    pub output_stereo: bool,
    pub kana: String,
}

impl MoraModel {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.consonant.is_some() != self.consonant_length.is_some() {
            return Err(Error::InvalidMora {
                context: format!(
                    "consonant and consonant_length must be both set or both unset: {:?}",
                    self.text
                ),
            });
        }
        if let Some(consonant) = &self.consonant {
            if !is_known_phoneme(consonant) || OjtPhoneme::new(consonant).is_mora_phoneme() {
                return Err(Error::InvalidMora {
                    context: format!("unknown consonant phoneme: {consonant:?}"),
                });
            }
        }
        if !OjtPhoneme::new(&self.vowel).is_mora_phoneme() {
            return Err(Error::InvalidMora {
                context: format!("unknown vowel phoneme: {:?}", self.vowel),
            });
        }
        Ok(())
    }
}

impl AccentPhraseModel {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.moras.is_empty() {
            return Err(Error::InvalidAccentPhrase {
                context: "accent phrase must have at least one mora".to_string(),
            });
        }
        if !(1..=self.moras.len()).contains(&self.accent) {
            return Err(Error::InvalidAccentPhrase {
                context: format!(
                    "accent must be in 1..={} but got {}",
                    self.moras.len(),
                    self.accent
                ),
            });
        }
        for mora in self.moras.iter().chain(&self.pause_mora) {
            mora.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn validate_accent_phrases(accent_phrases: &[AccentPhraseModel]) -> Result<()> {
    accent_phrases
        .iter()
        .try_for_each(AccentPhraseModel::validate)
}

impl AudioQueryModel {
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("speed_scale", self.speed_scale),
            ("pitch_scale", self.pitch_scale),
            ("intonation_scale", self.intonation_scale),
            ("volume_scale", self.volume_scale),
            ("pre_phoneme_length", self.pre_phoneme_length),
            ("post_phoneme_length", self.post_phoneme_length),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidAudioQuery {
                    context: format!("{name} must be finite but got {value}"),
                });
            }
            // 負のスケール値は合成自体は通るため警告に留める。
            if name != "pitch_scale" && value < 0.0 {
                tracing::warn!("audio query has negative {name}: {value}");
            }
        }
        validate_accent_phrases(&self.accent_phrases)
    }
}
