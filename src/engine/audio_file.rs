use std::io::{Cursor, Write as _};

use super::model::AudioQueryModel;
use super::DEFAULT_SAMPLING_RATE;

/// 合成した波形をクエリの音量・チャンネル数・サンプリングレートに合わせて
/// 16bit little-endian PCMへ変換する。
///
/// レート変換は `output_sampling_rate / 24000` の整数倍の単純な繰り返しのみ。
/// 整数倍でないレートは切り捨てた倍率で出力される(既知の制限)。
pub(crate) fn to_s16le_pcm(wave: &[f32], query: &AudioQueryModel) -> Vec<u8> {
    let volume_scale = query.volume_scale;
    let num_channels: u32 = if query.output_stereo { 2 } else { 1 };
    let repeat_count: u32 = (query.output_sampling_rate / DEFAULT_SAMPLING_RATE) * num_channels;

    let bytes_size = wave.len() as u32 * repeat_count * 2;
    let buf: Vec<u8> = Vec::with_capacity(bytes_size as usize);
    let mut cur = Cursor::new(buf);

    for value in wave {
        let v = (value * volume_scale).clamp(-1., 1.);
        let data = (v * 0x7fff as f32).round() as i16;
        for _ in 0..repeat_count {
            cur.write_all(&data.to_le_bytes()).unwrap();
        }
    }

    cur.into_inner()
}

/// 16bit PCMにヘッダを付加しWAVフォーマットのバイナリを生成する。
pub fn wav_from_s16le(pcm: &[u8], output_sampling_rate: u32, output_stereo: bool) -> Vec<u8> {
    let num_channels: u16 = if output_stereo { 2 } else { 1 };
    let bit_depth: u16 = 16;
    let block_size: u16 = bit_depth * num_channels / 8;

    let bytes_size = pcm.len() as u32;
    let wave_size = bytes_size + 44;

    let buf: Vec<u8> = Vec::with_capacity(wave_size as usize);
    let mut cur = Cursor::new(buf);

    cur.write_all("RIFF".as_bytes()).unwrap();
    cur.write_all(&(wave_size - 8).to_le_bytes()).unwrap();
    cur.write_all("WAVEfmt ".as_bytes()).unwrap();
    cur.write_all(&16_u32.to_le_bytes()).unwrap(); // fmt header length
    cur.write_all(&1_u16.to_le_bytes()).unwrap(); // linear PCM
    cur.write_all(&num_channels.to_le_bytes()).unwrap();
    cur.write_all(&output_sampling_rate.to_le_bytes()).unwrap();

    let block_rate = output_sampling_rate * block_size as u32;

    cur.write_all(&block_rate.to_le_bytes()).unwrap();
    cur.write_all(&block_size.to_le_bytes()).unwrap();
    cur.write_all(&bit_depth.to_le_bytes()).unwrap();
    cur.write_all("data".as_bytes()).unwrap();
    cur.write_all(&bytes_size.to_le_bytes()).unwrap();
    cur.write_all(pcm).unwrap();
    cur.into_inner()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::super::model::AudioQueryModel;
    use super::{to_s16le_pcm, wav_from_s16le};

    fn query(volume_scale: f32, output_sampling_rate: u32, output_stereo: bool) -> AudioQueryModel {
        AudioQueryModel {
            accent_phrases: vec![],
            speed_scale: 1.,
            pitch_scale: 0.,
            intonation_scale: 1.,
            volume_scale,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate,
            output_stereo,
            kana: String::new(),
        }
    }

    fn decode_s16le(pcm: &[u8]) -> Vec<i16> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_wav_header_layout() {
        let pcm = vec![0u8; 100];
        let wav = wav_from_s16le(&pcm, 24000, false);
        assert_eq!(144, wav.len());
        assert_eq!(b"RIFF", &wav[0..4]);
        assert_eq!(136u32.to_le_bytes(), wav[4..8]);
        assert_eq!(b"WAVE", &wav[8..12]);
        assert_eq!(b"fmt ", &wav[12..16]);
        assert_eq!(16u32.to_le_bytes(), wav[16..20]);
        assert_eq!(1u16.to_le_bytes(), wav[20..22]); // PCM_INTEGER
        assert_eq!(1u16.to_le_bytes(), wav[22..24]); // mono
        assert_eq!(24000u32.to_le_bytes(), wav[24..28]);
        assert_eq!(48000u32.to_le_bytes(), wav[28..32]); // byte rate
        assert_eq!(2u16.to_le_bytes(), wav[32..34]); // block align
        assert_eq!(16u16.to_le_bytes(), wav[34..36]);
        assert_eq!(b"data", &wav[36..40]);
        assert_eq!(100u32.to_le_bytes(), wav[40..44]);
    }

    #[test]
    fn test_pcm_round_trip_within_one_step() {
        let wave = [0., 1., -1., 0.5, -0.25, 0.125];
        let pcm = to_s16le_pcm(&wave, &query(1., 24000, false));
        let decoded = decode_s16le(&pcm);
        assert_eq!(wave.len(), decoded.len());
        for (original, decoded) in wave.iter().zip(decoded) {
            let restored = decoded as f32 / 0x7fff as f32;
            assert!(
                (original - restored).abs() <= 1. / 0x7fff as f32,
                "{original} != {restored}"
            );
        }
    }

    #[test]
    fn test_volume_scale_and_clipping() {
        let pcm = to_s16le_pcm(&[0.5, 1.], &query(4., 24000, false));
        let decoded = decode_s16le(&pcm);
        // 2.0も4.0も[-1, 1]へクリップされる。
        assert_eq!(vec![0x7fff, 0x7fff], decoded);
    }

    #[rstest]
    #[case(24000, false, 1)]
    #[case(24000, true, 2)]
    #[case(48000, false, 2)]
    #[case(48000, true, 4)]
    #[case(44100, false, 1)] // 整数倍でないレートは切り捨て
    fn test_repeat_count(
        #[case] output_sampling_rate: u32,
        #[case] output_stereo: bool,
        #[case] expected_repeat: usize,
    ) {
        let pcm = to_s16le_pcm(&[0.25], &query(1., output_sampling_rate, output_stereo));
        let decoded = decode_s16le(&pcm);
        assert_eq!(expected_repeat, decoded.len());
        assert!(decoded.iter().all(|&v| v == decoded[0]));
    }
}
