use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// [`StyleId`]の実体。
pub type RawStyleId = u32;

/// スタイルID。ある話者のあるスタイルを指す不透明な番号。
#[derive(PartialEq, Eq, Clone, Copy, Ord, PartialOrd, Hash, Deserialize, Serialize, Debug)]
pub struct StyleId(RawStyleId);

impl StyleId {
    pub fn new(id: RawStyleId) -> Self {
        Self(id)
    }

    pub fn raw_id(self) -> RawStyleId {
        self.0
    }
}

impl Display for StyleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw_id())
    }
}

/// 音声モデルのメタ情報。メタ情報JSONは話者の列。
pub type VoiceModelMeta = Vec<SpeakerMeta>;

/// 話者のメタ情報。
#[derive(Deserialize, Serialize, Clone, PartialEq, Debug)]
pub struct SpeakerMeta {
    /// 話者名。
    pub name: String,
    /// 話者に属するスタイル。
    pub styles: Vec<StyleMeta>,
    /// 話者のバージョン。
    pub version: String,
    /// 話者のUUID。
    pub speaker_uuid: String,
}

/// スタイルのメタ情報。
#[derive(Deserialize, Serialize, Clone, PartialEq, Debug)]
pub struct StyleMeta {
    /// スタイルID。
    pub id: StyleId,
    /// スタイル名。
    pub name: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{StyleId, VoiceModelMeta};
    use crate::test_util::SAMPLE_METAS_JSON;

    #[test]
    fn metas_json_round_trip() {
        let metas: VoiceModelMeta = serde_json::from_str(SAMPLE_METAS_JSON).unwrap();
        assert_eq!(2, metas.len());
        assert_eq!("dummy1", metas[0].name);
        assert_eq!(StyleId::new(2), metas[0].styles[1].id);

        let serialized = serde_json::to_string(&metas).unwrap();
        let reparsed: VoiceModelMeta = serde_json::from_str(&serialized).unwrap();
        assert_eq!(metas, reparsed);
    }

    #[test]
    fn broken_metas_json_is_rejected() {
        let result = serde_json::from_str::<VoiceModelMeta>(r#"[{"name": 42}]"#);
        assert!(result.is_err());
    }
}
