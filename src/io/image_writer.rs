use crate::types::{GprError, GprResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array3, ArrayView3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// On-disk container for an accumulated image: shape plus row-major samples
#[derive(Serialize, Deserialize)]
struct ImageContainer<T> {
    shape: (usize, usize, usize),
    samples: Vec<T>,
}

/// Write an accumulated image to a gzip-compressed container
pub fn write_image<T, P>(path: P, image: &ArrayView3<'_, T>) -> GprResult<()>
where
    T: Serialize + Clone,
    P: AsRef<Path>,
{
    let container = ImageContainer {
        shape: image.dim(),
        samples: image.iter().cloned().collect(),
    };
    let file = File::create(path.as_ref())?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    bincode::serialize_into(&mut encoder, &container)?;
    encoder.finish()?.flush()?;
    log::info!(
        "Wrote {} x {} x {} image to {}",
        container.shape.0,
        container.shape.1,
        container.shape.2,
        path.as_ref().display()
    );
    Ok(())
}

/// Read an image container back into an array
pub fn read_image<T, P>(path: P) -> GprResult<Array3<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let container: ImageContainer<T> = bincode::deserialize_from(decoder)?;
    Array3::from_shape_vec(container.shape, container.samples)
        .map_err(|e| GprError::Processing(format!("corrupt image container: {}", e)))
}
