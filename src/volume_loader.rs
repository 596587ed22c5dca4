use crate::{
    enums::SortBy,
    error::{Error, Result},
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::{fs, path::Path};
use tracing::debug;

/// Decoder capability turning a path into a [`Volume`].
///
/// No intensity transformation happens here beyond what the format itself
/// prescribes (NIfTI `scl_slope`/`scl_inter`, DICOM modality rescale).
pub trait VolumeReader {
    /// # Errors
    ///
    /// [`Error::Decode`] when the file cannot be parsed or holds no data,
    /// [`Error::UnsupportedShape`] when its rank is not 2, 3 or 4.
    fn read(&self, path: &Path) -> Result<Volume>;
}

impl<R: VolumeReader + ?Sized> VolumeReader for &R {
    fn read(&self, path: &Path) -> Result<Volume> {
        (**self).read(path)
    }
}

/// Reads `.nii` and `.nii.gz` files.
#[derive(Clone, Copy, Debug, Default)]
pub struct NiftiReader;

impl VolumeReader for NiftiReader {
    fn read(&self, path: &Path) -> Result<Volume> {
        let object = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| Error::decode(path, e))?;
        let data = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| Error::decode(path, e))?;
        if data.is_empty() {
            return Err(Error::decode(path, "volume holds no voxels"));
        }
        debug!(path = %path.display(), shape = ?data.shape(), "decoded NIfTI volume");
        Volume::from_dyn(data)
    }
}

/// Reads a directory of single-frame `.dcm` files as one `H × W × Z` stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomSeriesReader {
    pub sort_by: SortBy,
}

impl VolumeReader for DicomSeriesReader {
    fn read(&self, path: &Path) -> Result<Volume> {
        let paths: Vec<_> = fs::read_dir(path)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(Error::decode(path, "no .dcm files in series directory"));
        }

        let objects = paths
            .iter()
            .map(|file| open_file(file).map_err(|e| Error::decode(file, e)))
            .collect::<Result<Vec<_>>>()?;

        let data = Self::load_from_dicom_objects(&objects, self.sort_by)
            .map_err(|reason| Error::decode(path, reason))?;
        debug!(path = %path.display(), shape = ?data.dim(), "decoded DICOM series");
        Ok(Volume::Stack(data))
    }
}

impl DicomSeriesReader {
    pub fn new(sort_by: SortBy) -> Self {
        Self { sort_by }
    }

    /// Stack decoded DICOM objects along Z after sorting them.
    ///
    /// # Errors
    ///
    /// Returns a description when no object carries decodable pixel data or
    /// the in-plane dimensions disagree.
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> std::result::Result<Array3<f32>, &'static str> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err("no valid DICOM images found");
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;
        Ok(Self::build_volume_array(&images))
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<(Option<f32>, Array2<f32>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    // Modality LUT applied, VOI LUT skipped: values stay in HU.
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<f32>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<f32>]) -> std::result::Result<(), &'static str> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err("inconsistent image dimensions");
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((height, width, depth));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![.., .., i]).assign(image);
        }

        volume
    }
}

/// Picks the DICOM reader for directories and the NIfTI reader otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoReader {
    pub dicom: DicomSeriesReader,
}

impl VolumeReader for AutoReader {
    fn read(&self, path: &Path) -> Result<Volume> {
        if path.is_dir() {
            self.dicom.read(path)
        } else {
            NiftiReader.read(path)
        }
    }
}

/// Whether `path` looks like a volume [`AutoReader`] can open.
pub fn is_volume_path(path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.ends_with(".nii") || name.ends_with(".nii.gz") || name.ends_with(".hdr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nifti::writer::WriterOptions;
    use tempfile::tempdir;

    #[test]
    fn reads_nifti_stack() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ct.nii");
        let data = Array3::from_shape_fn((4, 5, 6), |(h, w, z)| (h * 100 + w * 10 + z) as f32);
        WriterOptions::new(&path).write_nifti(&data).unwrap();

        let volume = NiftiReader.read(&path).unwrap();
        assert_eq!(volume.rank(), 3);
        assert_eq!(volume.depth(), 6);
        assert_eq!(volume.plane_dim(), (4, 5));
        let plane = volume.extract(3).unwrap();
        assert_eq!(plane[[2, 1]], 213.0);
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.nii");
        fs::write(&path, b"definitely not a nifti header").unwrap();
        assert!(matches!(
            NiftiReader.read(&path),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn empty_series_directory_is_a_decode_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            AutoReader::default().read(dir.path()),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn sorts_by_position_descending() {
        let mut images = vec![
            (Some(2.0), Array2::from_elem((1, 1), 2.0)),
            (Some(0.0), Array2::from_elem((1, 1), 0.0)),
            (Some(1.0), Array2::from_elem((1, 1), 1.0)),
        ];
        DicomSeriesReader::sort_images(&mut images, SortBy::ImagePositionPatient);
        let order: Vec<f32> = images.iter().map(|(_, img)| img[[0, 0]]).collect();
        assert_eq!(order, vec![2.0, 1.0, 0.0]);

        DicomSeriesReader::sort_images(&mut images, SortBy::InstanceNumber);
        let order: Vec<f32> = images.iter().map(|(_, img)| img[[0, 0]]).collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn stacks_slices_along_last_axis() {
        let images = vec![Array2::from_elem((2, 3), 1.0), Array2::from_elem((2, 3), 5.0)];
        let volume = DicomSeriesReader::build_volume_array(&images);
        assert_eq!(volume.dim(), (2, 3, 2));
        assert_eq!(volume[[1, 2, 1]], 5.0);
        assert!(DicomSeriesReader::validate_dimensions(&images).is_ok());

        let mismatched = vec![Array2::zeros((2, 3)), Array2::zeros((3, 2))];
        assert!(DicomSeriesReader::validate_dimensions(&mismatched).is_err());
    }

    #[test]
    fn recognises_volume_paths() {
        assert!(is_volume_path(Path::new("scan.nii")));
        assert!(is_volume_path(Path::new("scan.NII.GZ")));
        assert!(!is_volume_path(Path::new("notes.txt")));
    }
}
