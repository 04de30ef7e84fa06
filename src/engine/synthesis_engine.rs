use crate::inference_core::InferenceCore;
use crate::metas::StyleId;
use crate::Result;

use super::acoustic_feature_extractor::OjtPhoneme;
use super::audio_file::{to_s16le_pcm, wav_from_s16le};
use super::full_context_label::Utterance;
use super::model::{AccentPhraseModel, AudioQueryModel, MoraModel};
use super::mora_list::mora2text;
use super::open_jtalk::OpenJtalk;

/// 言語処理と推論を束ねて高水準の合成操作を提供する。
pub(crate) struct SynthesisEngine {
    inference_core: InferenceCore,
    open_jtalk: OpenJtalk,
}

impl SynthesisEngine {
    pub fn new(inference_core: InferenceCore, open_jtalk: OpenJtalk) -> Self {
        Self {
            inference_core,
            open_jtalk,
        }
    }

    pub fn inference_core(&self) -> &InferenceCore {
        &self.inference_core
    }

    pub fn inference_core_mut(&mut self) -> &mut InferenceCore {
        &mut self.inference_core
    }

    pub fn create_accent_phrases(
        &self,
        text: &str,
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let utterance = Utterance::extract_full_context_label(&self.open_jtalk, text)?;

        let accent_phrases: Vec<AccentPhraseModel> = utterance
            .breath_groups
            .iter()
            .enumerate()
            .fold(Vec::new(), |mut accum_vec, (i, breath_group)| {
                accum_vec.extend(breath_group.accent_phrases.iter().enumerate().map(
                    |(j, accent_phrase)| {
                        let moras = accent_phrase
                            .moras
                            .iter()
                            .map(|mora| {
                                let mora_text = mora
                                    .phonemes()
                                    .iter()
                                    .map(|phoneme| phoneme.phoneme().to_string())
                                    .collect::<Vec<_>>()
                                    .join("");

                                let (consonant, consonant_length) =
                                    if let Some(consonant) = &mora.consonant {
                                        (Some(consonant.phoneme().to_string()), Some(0.))
                                    } else {
                                        (None, None)
                                    };

                                MoraModel {
                                    text: mora_to_text(&mora_text),
                                    consonant,
                                    consonant_length,
                                    vowel: mora.vowel.phoneme().into(),
                                    vowel_length: 0.,
                                    pitch: 0.,
                                }
                            })
                            .collect();

                        let pause_mora = if i != utterance.breath_groups.len() - 1
                            && j == breath_group.accent_phrases.len() - 1
                        {
                            Some(MoraModel {
                                text: "、".into(),
                                consonant: None,
                                consonant_length: None,
                                vowel: "pau".into(),
                                vowel_length: 0.,
                                pitch: 0.,
                            })
                        } else {
                            None
                        };

                        AccentPhraseModel {
                            moras,
                            accent: accent_phrase.accent,
                            pause_mora,
                            is_interrogative: accent_phrase.is_interrogative,
                        }
                    },
                ));

                accum_vec
            });

        self.replace_mora_data(&accent_phrases, style_id)
    }

    pub fn replace_mora_data(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        let accent_phrases = self.replace_phoneme_length(accent_phrases, style_id)?;
        self.replace_mora_pitch(&accent_phrases, style_id)
    }

    pub fn replace_phoneme_length(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        let (_, phoneme_data_list) = initial_process(accent_phrases);
        let (_, _, vowel_indexes_data) = split_mora(&phoneme_data_list);

        let phoneme_list_s: Vec<i64> = phoneme_data_list
            .iter()
            .map(OjtPhoneme::phoneme_id)
            .collect();
        let phoneme_length = self
            .inference_core
            .predict_duration(&phoneme_list_s, style_id)?;

        Ok(apply_phoneme_length(
            accent_phrases,
            &phoneme_length,
            &vowel_indexes_data,
        ))
    }

    pub fn replace_mora_pitch(
        &self,
        accent_phrases: &[AccentPhraseModel],
        style_id: StyleId,
    ) -> Result<Vec<AccentPhraseModel>> {
        let (_, phoneme_data_list) = initial_process(accent_phrases);

        let base_start_accent_list: Vec<i64> = std::iter::once(0)
            .chain(accent_phrases.iter().flat_map(|accent_phrase| {
                create_one_accent_list(accent_phrase, i32::from(accent_phrase.accent != 1))
            }))
            .chain(std::iter::once(0))
            .collect();
        let base_end_accent_list: Vec<i64> = std::iter::once(0)
            .chain(accent_phrases.iter().flat_map(|accent_phrase| {
                create_one_accent_list(accent_phrase, accent_phrase.accent as i32 - 1)
            }))
            .chain(std::iter::once(0))
            .collect();
        let base_start_accent_phrase_list: Vec<i64> = std::iter::once(0)
            .chain(
                accent_phrases
                    .iter()
                    .flat_map(|accent_phrase| create_one_accent_list(accent_phrase, 0)),
            )
            .chain(std::iter::once(0))
            .collect();
        let base_end_accent_phrase_list: Vec<i64> = std::iter::once(0)
            .chain(
                accent_phrases
                    .iter()
                    .flat_map(|accent_phrase| create_one_accent_list(accent_phrase, -1)),
            )
            .chain(std::iter::once(0))
            .collect();

        let (consonant_phoneme_data_list, vowel_phoneme_data_list, vowel_indexes) =
            split_mora(&phoneme_data_list);

        let consonant_phoneme_list: Vec<i64> = consonant_phoneme_data_list
            .iter()
            .map(OjtPhoneme::phoneme_id)
            .collect();
        let vowel_phoneme_list: Vec<i64> = vowel_phoneme_data_list
            .iter()
            .map(OjtPhoneme::phoneme_id)
            .collect();

        // モデルはモーラ単位で動くため、母音位置で間引く。
        let start_accent_list: Vec<i64> = vowel_indexes
            .iter()
            .map(|i| base_start_accent_list[*i as usize])
            .collect();
        let end_accent_list: Vec<i64> = vowel_indexes
            .iter()
            .map(|i| base_end_accent_list[*i as usize])
            .collect();
        let start_accent_phrase_list: Vec<i64> = vowel_indexes
            .iter()
            .map(|i| base_start_accent_phrase_list[*i as usize])
            .collect();
        let end_accent_phrase_list: Vec<i64> = vowel_indexes
            .iter()
            .map(|i| base_end_accent_phrase_list[*i as usize])
            .collect();

        let mut f0_list = self.inference_core.predict_intonation(
            vowel_phoneme_list.len(),
            &vowel_phoneme_list,
            &consonant_phoneme_list,
            &start_accent_list,
            &end_accent_list,
            &start_accent_phrase_list,
            &end_accent_phrase_list,
            style_id,
        )?;

        for (f0, vowel_phoneme) in f0_list.iter_mut().zip(&vowel_phoneme_data_list) {
            if vowel_phoneme.is_unvoiced_mora_phoneme() {
                *f0 = 0.;
            }
        }

        Ok(apply_mora_pitch(accent_phrases, &f0_list))
    }

    pub fn synthesis(
        &self,
        query: &AudioQueryModel,
        style_id: StyleId,
        enable_interrogative_upspeak: bool,
    ) -> Result<Vec<f32>> {
        query.validate()?;

        let accent_phrases = if enable_interrogative_upspeak {
            adjust_interrogative_accent_phrases(&query.accent_phrases)
        } else {
            query.accent_phrases.clone()
        };

        let DecoderFeature { f0, phoneme } = DecoderFeature::new(
            &accent_phrases,
            query.speed_scale,
            query.pitch_scale,
            query.intonation_scale,
            query.pre_phoneme_length,
            query.post_phoneme_length,
        );

        self.inference_core.decode(
            f0.len(),
            OjtPhoneme::num_phoneme(),
            &f0,
            &phoneme,
            style_id,
        )
    }

    pub fn synthesis_wave_format(
        &self,
        query: &AudioQueryModel,
        style_id: StyleId,
        enable_interrogative_upspeak: bool,
    ) -> Result<Vec<u8>> {
        let wave = self.synthesis(query, style_id, enable_interrogative_upspeak)?;
        let pcm = to_s16le_pcm(&wave, query);
        Ok(wav_from_s16le(
            &pcm,
            query.output_sampling_rate,
            query.output_stereo,
        ))
    }

    pub fn load_openjtalk_dict(&mut self, mecab_dict_dir: impl AsRef<std::path::Path>) -> Result<()> {
        self.open_jtalk
            .load(mecab_dict_dir)
            .map_err(|_| crate::Error::NotLoadedOpenjtalkDict)
    }

    pub fn is_openjtalk_dict_loaded(&self) -> bool {
        self.open_jtalk.dict_loaded()
    }
}

/// デコーダへ渡すフレーム単位の特徴量。
pub(crate) struct DecoderFeature {
    pub(crate) f0: Vec<f32>,
    pub(crate) phoneme: Vec<f32>,
}

impl DecoderFeature {
    const RATE: f32 = 24000. / 256.;

    pub(crate) fn new(
        accent_phrases: &[AccentPhraseModel],
        speed_scale: f32,
        pitch_scale: f32,
        intonation_scale: f32,
        pre_phoneme_length: f32,
        post_phoneme_length: f32,
    ) -> Self {
        let (flatten_moras, phoneme_data_list) = initial_process(accent_phrases);

        let mut phoneme_length_list = vec![pre_phoneme_length];
        let mut f0_list = vec![0.];
        let mut voiced_list = vec![false];
        {
            let mut sum_of_f0_bigger_than_zero = 0.;
            let mut count_of_f0_bigger_than_zero = 0;

            for mora in flatten_moras {
                if let Some(consonant_length) = mora.consonant_length {
                    phoneme_length_list.push(consonant_length);
                }
                phoneme_length_list.push(mora.vowel_length);

                let f0_single = mora.pitch * 2.0_f32.powf(pitch_scale);
                f0_list.push(f0_single);

                let bigger_than_zero = f0_single > 0.;
                voiced_list.push(bigger_than_zero);

                if bigger_than_zero {
                    sum_of_f0_bigger_than_zero += f0_single;
                    count_of_f0_bigger_than_zero += 1;
                }
            }
            phoneme_length_list.push(post_phoneme_length);
            f0_list.push(0.);
            voiced_list.push(false);

            let mean_f0 = sum_of_f0_bigger_than_zero / (count_of_f0_bigger_than_zero as f32);
            if !mean_f0.is_nan() {
                for (f0, voiced) in f0_list.iter_mut().zip(voiced_list) {
                    if voiced {
                        *f0 = (*f0 - mean_f0) * intonation_scale + mean_f0;
                    }
                }
            }
        }

        let (_, _, vowel_indexes) = split_mora(&phoneme_data_list);

        let mut phoneme: Vec<f32> = Vec::new();
        let mut f0: Vec<f32> = Vec::new();
        {
            let mut sum_of_phoneme_length = 0;
            let mut count_of_f0 = 0;
            let mut vowel_indexes_index = 0;

            for (i, phoneme_length) in phoneme_length_list.iter().enumerate() {
                let phoneme_length =
                    ((*phoneme_length * Self::RATE).round() / speed_scale).round() as usize;
                let phoneme_id = phoneme_data_list[i].phoneme_id();

                for _ in 0..phoneme_length {
                    let mut phonemes_vec = vec![0.; OjtPhoneme::num_phoneme()];
                    phonemes_vec[phoneme_id as usize] = 1.;
                    phoneme.extend(phonemes_vec);
                }
                sum_of_phoneme_length += phoneme_length;

                if i as i64 == vowel_indexes[vowel_indexes_index] {
                    for _ in 0..sum_of_phoneme_length {
                        f0.push(f0_list[count_of_f0]);
                    }
                    count_of_f0 += 1;
                    sum_of_phoneme_length = 0;
                    vowel_indexes_index += 1;
                }
            }
        }

        Self { f0, phoneme }
    }
}

pub(crate) fn to_flatten_moras(accent_phrases: &[AccentPhraseModel]) -> Vec<MoraModel> {
    accent_phrases
        .iter()
        .flat_map(|accent_phrase| {
            accent_phrase
                .moras
                .iter()
                .chain(&accent_phrase.pause_mora)
                .cloned()
        })
        .collect()
}

/// モーラ列を`pau`で挟んだ音素列へ展開する。
pub(crate) fn initial_process(
    accent_phrases: &[AccentPhraseModel],
) -> (Vec<MoraModel>, Vec<OjtPhoneme>) {
    let flatten_moras = to_flatten_moras(accent_phrases);

    let phoneme_strings: Vec<String> = std::iter::once("pau".to_string())
        .chain(flatten_moras.iter().flat_map(|mora| {
            mora.consonant
                .clone()
                .into_iter()
                .chain(std::iter::once(mora.vowel.clone()))
        }))
        .chain(std::iter::once("pau".to_string()))
        .collect();

    let phoneme_data_list = OjtPhoneme::convert(
        &phoneme_strings
            .into_iter()
            .map(OjtPhoneme::new)
            .collect::<Vec<_>>(),
    );

    (flatten_moras, phoneme_data_list)
}

/// アクセント句内の`point`位置(負値は末尾基準)にだけ1を立てた音素単位のベクトルを作る。
pub(crate) fn create_one_accent_list(accent_phrase: &AccentPhraseModel, point: i32) -> Vec<i64> {
    accent_phrase
        .moras
        .iter()
        .enumerate()
        .flat_map(|(i, mora)| {
            let value = (i as i32 == point
                || (point < 0 && i == (accent_phrase.moras.len() as i32 + point) as usize))
                .into();
            std::iter::once(value).chain(mora.consonant.as_ref().map(|_| value))
        })
        .chain(accent_phrase.pause_mora.as_ref().map(|_| 0))
        .collect()
}

/// 音素列を母音位置で分割し、(子音列, 母音列, 母音位置)を返す。
pub(crate) fn split_mora(phoneme_list: &[OjtPhoneme]) -> (Vec<OjtPhoneme>, Vec<OjtPhoneme>, Vec<i64>) {
    let vowel_indexes: Vec<i64> = phoneme_list
        .iter()
        .enumerate()
        .filter_map(|(i, phoneme)| phoneme.is_mora_phoneme().then_some(i as i64))
        .collect();

    let vowel_phoneme_list = vowel_indexes
        .iter()
        .map(|i| phoneme_list[*i as usize].clone())
        .collect();

    let consonant_phoneme_list = std::iter::once(OjtPhoneme::default())
        .chain(vowel_indexes.windows(2).map(|w| {
            let (prev, next) = (w[0], w[1]);
            if next - prev == 1 {
                OjtPhoneme::default()
            } else {
                phoneme_list[next as usize - 1].clone()
            }
        }))
        .collect();

    (consonant_phoneme_list, vowel_phoneme_list, vowel_indexes)
}

/// 推論した音素長をモーラへ書き戻す。母音位置`index + 1`が該当モーラの母音、
/// その直前が子音。
pub(crate) fn apply_phoneme_length(
    accent_phrases: &[AccentPhraseModel],
    phoneme_length: &[f32],
    vowel_indexes_data: &[i64],
) -> Vec<AccentPhraseModel> {
    let mut index = 0;
    accent_phrases
        .iter()
        .map(|accent_phrase| AccentPhraseModel {
            moras: accent_phrase
                .moras
                .iter()
                .map(|mora| {
                    let new_mora = MoraModel {
                        text: mora.text.clone(),
                        consonant: mora.consonant.clone(),
                        consonant_length: mora
                            .consonant
                            .as_ref()
                            .map(|_| phoneme_length[vowel_indexes_data[index + 1] as usize - 1]),
                        vowel: mora.vowel.clone(),
                        vowel_length: phoneme_length[vowel_indexes_data[index + 1] as usize],
                        pitch: mora.pitch,
                    };
                    index += 1;
                    new_mora
                })
                .collect(),
            accent: accent_phrase.accent,
            pause_mora: accent_phrase.pause_mora.as_ref().map(|pause_mora| {
                let new_pause_mora = MoraModel {
                    text: pause_mora.text.clone(),
                    consonant: pause_mora.consonant.clone(),
                    consonant_length: pause_mora.consonant_length,
                    vowel: pause_mora.vowel.clone(),
                    vowel_length: phoneme_length[vowel_indexes_data[index + 1] as usize],
                    pitch: pause_mora.pitch,
                };
                index += 1;
                new_pause_mora
            }),
            is_interrogative: accent_phrase.is_interrogative,
        })
        .collect()
}

/// 推論したピッチをモーラへ書き戻す。`f0_list`の先頭は文頭の`pau`の分。
pub(crate) fn apply_mora_pitch(
    accent_phrases: &[AccentPhraseModel],
    f0_list: &[f32],
) -> Vec<AccentPhraseModel> {
    let mut index = 0;
    accent_phrases
        .iter()
        .map(|accent_phrase| AccentPhraseModel {
            moras: accent_phrase
                .moras
                .iter()
                .map(|mora| {
                    let new_mora = MoraModel {
                        pitch: f0_list[index + 1],
                        ..mora.clone()
                    };
                    index += 1;
                    new_mora
                })
                .collect(),
            accent: accent_phrase.accent,
            pause_mora: accent_phrase.pause_mora.as_ref().map(|pause_mora| {
                let new_pause_mora = MoraModel {
                    pitch: f0_list[index + 1],
                    ..pause_mora.clone()
                };
                index += 1;
                new_pause_mora
            }),
            is_interrogative: accent_phrase.is_interrogative,
        })
        .collect()
}

fn mora_to_text(mora: &str) -> String {
    let last_char = mora.chars().last().unwrap();
    let mora = if ['A', 'I', 'U', 'E', 'O'].contains(&last_char) {
        format!("{}{}", &mora[0..mora.len() - 1], last_char.to_lowercase())
    } else {
        mora.to_string()
    };
    // もしカタカナに変換できなければ、引数で与えた文字列がそのまま返ってくる
    mora2text(&mora).to_string()
}

pub(crate) fn adjust_interrogative_accent_phrases(
    accent_phrases: &[AccentPhraseModel],
) -> Vec<AccentPhraseModel> {
    accent_phrases
        .iter()
        .map(|accent_phrase| AccentPhraseModel {
            moras: adjust_interrogative_moras(accent_phrase),
            accent: accent_phrase.accent,
            pause_mora: accent_phrase.pause_mora.clone(),
            is_interrogative: accent_phrase.is_interrogative,
        })
        .collect()
}

fn adjust_interrogative_moras(accent_phrase: &AccentPhraseModel) -> Vec<MoraModel> {
    let moras = &accent_phrase.moras;
    if accent_phrase.is_interrogative && !moras.is_empty() {
        let last_mora = moras.last().expect("non-empty by the check above");
        if last_mora.pitch != 0.0 {
            let mut new_moras = Vec::with_capacity(moras.len() + 1);
            new_moras.extend_from_slice(moras);
            new_moras.push(make_interrogative_mora(last_mora));
            return new_moras;
        }
    }
    moras.clone()
}

fn make_interrogative_mora(last_mora: &MoraModel) -> MoraModel {
    const FIX_VOWEL_LENGTH: f32 = 0.15;
    const ADJUST_PITCH: f32 = 0.3;
    const MAX_PITCH: f32 = 6.5;

    MoraModel {
        text: mora_to_text(&last_mora.vowel),
        consonant: None,
        consonant_length: None,
        vowel: last_mora.vowel.clone(),
        vowel_length: FIX_VOWEL_LENGTH,
        pitch: (last_mora.pitch + ADJUST_PITCH).min(MAX_PITCH),
    }
}
