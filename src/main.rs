use std::path::PathBuf;

use volume_wrapper::{
    enums::{DisplayAxis, SortBy},
    loader::{DicomSeriesLoader, NativeImageSource},
    display::DisplayMappingPolicy,
    settings::SettingsRegistry,
};

fn main() {
    env_logger::init();

    let loader = DicomSeriesLoader::from_directory(PathBuf::from("dicom"), SortBy::InstanceNumber)
        .expect("should have found files in directory");
    let mut wrapper = loader
        .load_wrapper(DisplayMappingPolicy::default())
        .expect("should have loaded the series");
    wrapper.set_file_name("dicom");

    if let Ok(registry) = SettingsRegistry::load("settings.json") {
        registry
            .apply(wrapper.as_mut())
            .expect("should have applied saved settings");
    }

    let slice = wrapper
        .display_slice(DisplayAxis::Coronal)
        .expect("should have returned slice at center of volume");
    slice.save("result.png").expect("should have written the slice");
    wrapper
        .write_thumbnail(&PathBuf::from("thumbnail.png"), 128)
        .expect("should have written the thumbnail");
}
