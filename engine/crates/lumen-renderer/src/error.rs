use lumen_asset::AssetError;
use lumen_gfx::GfxError;

/// 模型加载的错误
///
/// 资源错误保留了具体的种类，调用方可以据此区分文件缺失、文件损坏和结构错误
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Gpu(#[from] GfxError),
}

/// 帧调度的错误
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Gfx(#[from] GfxError),

    /// 调用顺序不符合 acquire -> record -> submit -> present
    #[error("frame slot {slot}: expected state {expected}, found {found}")]
    Protocol {
        slot: usize,
        expected: &'static str,
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_asset::AssetErrorKind;

    #[test]
    fn asset_kind_survives_conversion() {
        let err: ModelError = AssetError::structural("scene.json", "material 3 out of range").into();
        match err {
            ModelError::Asset(asset) => assert_eq!(asset.kind(), AssetErrorKind::StructuralParse),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn protocol_message_names_states() {
        let err = FrameError::Protocol {
            slot: 1,
            expected: "Recorded",
            found: "Idle",
        };
        assert_eq!(err.to_string(), "frame slot 1: expected state Recorded, found Idle");
    }
}
