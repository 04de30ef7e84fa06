use ort::{CUDAExecutionProvider, DirectMLExecutionProvider, ExecutionProvider as _};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// このライブラリで利用可能なデバイスの情報。
///
/// あくまで本ライブラリが対応しているデバイスの情報であることに注意。GPUが使える環境では
/// なかったとしても`cuda`や`dml`は`true`を示しうる。
#[derive(Debug, Serialize, Deserialize)]
pub struct SupportedDevices {
    /// CPUが利用可能。常に`true`。
    pub cpu: bool,
    /// CUDA (CUDA Execution Provider)が利用可能。
    pub cuda: bool,
    /// DirectML (DirectML Execution Provider)が利用可能。
    pub dml: bool,
}

impl SupportedDevices {
    pub fn create() -> Result<Self> {
        let cuda = CUDAExecutionProvider::default()
            .is_available()
            .map_err(|e| Error::GetSupportedDevices(e.into()))?;
        let dml = DirectMLExecutionProvider::default()
            .is_available()
            .map_err(|e| Error::GetSupportedDevices(e.into()))?;

        Ok(Self {
            cpu: true,
            cuda,
            dml,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("should not fail")
    }
}
