use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::metas::RawStyleId;
use crate::{Error, Result};

/// 1モデル分のONNXファイル。モデルは3つのネットワークの組で1単位。
pub struct ModelFile {
    pub predict_duration_model: PathBuf,
    pub predict_intonation_model: PathBuf,
    pub decode_model: PathBuf,
}

/// 読み込んだ1モデル分のONNXバイト列。
pub(crate) struct ModelBytes {
    pub(crate) predict_duration_model: Vec<u8>,
    pub(crate) predict_intonation_model: Vec<u8>,
    pub(crate) decode_model: Vec<u8>,
}

/// モデル資産一式。メタ情報JSONとモデルファイルの場所、スタイルIDの振り分け表を持つ。
///
/// 振り分け表が空のときはすべてのスタイルがモデル0に属し、モデル内スタイルIDは
/// スタイルIDと同じ値になる。
pub struct ModelFileSet {
    pub(crate) metas_str: String,
    models: Vec<ModelFile>,
    pub(crate) style_id_map: BTreeMap<RawStyleId, (usize, RawStyleId)>,
}

impl ModelFileSet {
    pub fn new(metas_str: String, models: Vec<ModelFile>) -> Self {
        Self {
            metas_str,
            models,
            style_id_map: BTreeMap::new(),
        }
    }

    /// `metas.json`と`predict_duration-{i}.onnx`/`predict_intonation-{i}.onnx`/
    /// `decode-{i}.onnx`の3つ組を連番が途切れるまで探す。
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let metas_str = std::fs::read_to_string(dir.join("metas.json"))
            .with_context(|| format!("failed to read {:?}", dir.join("metas.json")))
            .map_err(Error::LoadMetas)?;

        let mut models = Vec::new();
        loop {
            let model = ModelFile {
                predict_duration_model: dir.join(format!("predict_duration-{}.onnx", models.len())),
                predict_intonation_model: dir
                    .join(format!("predict_intonation-{}.onnx", models.len())),
                decode_model: dir.join(format!("decode-{}.onnx", models.len())),
            };
            if !(model.predict_duration_model.exists()
                && model.predict_intonation_model.exists()
                && model.decode_model.exists())
            {
                break;
            }
            models.push(model);
        }

        Ok(Self::new(metas_str, models))
    }

    /// スタイルID → (モデル番号, モデル内スタイルID) の振り分け表を差し替える。
    pub fn with_style_id_map(
        mut self,
        style_id_map: BTreeMap<RawStyleId, (usize, RawStyleId)>,
    ) -> Self {
        self.style_id_map = style_id_map;
        self
    }

    pub fn models_count(&self) -> usize {
        self.models.len()
    }

    pub(crate) fn read_model_bytes(&self, model_index: usize) -> Result<ModelBytes> {
        let model = self
            .models
            .get(model_index)
            .ok_or(Error::ModelNotLoaded { model_index })?;

        let read = |path: &Path| {
            std::fs::read(path)
                .with_context(|| format!("failed to read {path:?}"))
                .map_err(Error::LoadModel)
        };

        Ok(ModelBytes {
            predict_duration_model: read(&model.predict_duration_model)?,
            predict_intonation_model: read(&model.predict_intonation_model)?,
            decode_model: read(&model.decode_model)?,
        })
    }
}
