use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tar::{Archive, Builder, Header};
use tracing::{debug, info};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

use super::{LinearSvm, StandardScaler, TrainedModel};
use crate::error::ModelError;
use crate::features::FeatureConfig;

const SCALER_ENTRY: &str = "scaler.json";
const CLASSIFIER_ENTRY: &str = "classifier.json";
const FEATURES_ENTRY: &str = "features.json";

/// Everything detection needs from training, persisted as a zstd-compressed
/// tar archive of JSON entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub features: FeatureConfig,
    pub model: TrainedModel,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ModelError + '_ {
    move |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn append_json<W: std::io::Write, T: Serialize>(
    tar: &mut Builder<W>,
    entry: &str,
    value: &T,
) -> Result<(), ModelError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ModelError::Format {
        entry: entry.to_string(),
        source,
    })?;
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    tar.append_data(&mut header, entry, bytes.as_slice())
        .map_err(|source| ModelError::Io {
            path: entry.into(),
            source,
        })
}

fn parse_json<T: DeserializeOwned>(entry: &str, contents: &str) -> Result<T, ModelError> {
    serde_json::from_str(contents).map_err(|source| ModelError::Format {
        entry: entry.to_string(),
        source,
    })
}

impl ModelBundle {
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(path))?;
        }

        let out = File::create(path).map_err(io_error(path))?;
        let encoder = ZstdEncoder::new(out, 3).map_err(io_error(path))?;
        let mut tar = Builder::new(encoder);

        append_json(&mut tar, SCALER_ENTRY, self.model.scaler())?;
        append_json(&mut tar, CLASSIFIER_ENTRY, self.model.svm())?;
        append_json(&mut tar, FEATURES_ENTRY, &self.features)?;

        // Finish tar, then finish zstd stream
        let encoder = tar.into_inner().map_err(io_error(path))?;
        encoder.finish().map_err(io_error(path))?;

        info!(path = %path.display(), dimension = self.model.scaler().dimension(), "saved model bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(io_error(path))?;
        let decoder = ZstdDecoder::new(file).map_err(io_error(path))?;
        let mut archive = Archive::new(decoder);

        let mut scaler: Option<StandardScaler> = None;
        let mut svm: Option<LinearSvm> = None;
        let mut features: Option<FeatureConfig> = None;

        for entry in archive.entries().map_err(io_error(path))? {
            let mut entry = entry.map_err(io_error(path))?;
            let name = entry
                .path()
                .map_err(io_error(path))?
                .to_string_lossy()
                .into_owned();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).map_err(io_error(path))?;

            match name.as_str() {
                SCALER_ENTRY => scaler = Some(parse_json(SCALER_ENTRY, &contents)?),
                CLASSIFIER_ENTRY => svm = Some(parse_json(CLASSIFIER_ENTRY, &contents)?),
                FEATURES_ENTRY => features = Some(parse_json(FEATURES_ENTRY, &contents)?),
                other => debug!(entry = other, "ignoring unknown bundle entry"),
            }
        }

        let scaler = scaler.ok_or(ModelError::MissingEntry(SCALER_ENTRY))?;
        let svm = svm.ok_or(ModelError::MissingEntry(CLASSIFIER_ENTRY))?;
        let features = features.ok_or(ModelError::MissingEntry(FEATURES_ENTRY))?;
        let model = TrainedModel::new(scaler, svm)?;

        info!(path = %path.display(), dimension = model.scaler().dimension(), "loaded model bundle");
        Ok(Self { features, model })
    }
}
