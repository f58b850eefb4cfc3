mod common;

use std::sync::Arc;

use common::synthetic_volume::{assert_close, halves_u16, ramp_u8, rgb_f32};
use image::Rgba;
use volume_wrapper::{
    ColorLabelTable, ColorMap, DisplayAxis, DisplayMappingPolicy, ExportChannel, ImageGeometry,
    ImageWrapper, IntensityCurve, LabelImageWrapper, NativeImage, NativeIntensityMapping,
    ScalarImageWrapper, ScalarRepresentation, ScalarStorage, TypedImageWrapper, VectorImageWrapper,
    WrapperError,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ramp_wrapper() -> ScalarImageWrapper<u8> {
    ScalarImageWrapper::from_array(ramp_u8(4, 4, 4), ImageGeometry::default())
        .expect("ramp should wrap")
}

fn oblique_geometry() -> ImageGeometry {
    let (s, c) = 0.4f64.sin_cos();
    ImageGeometry::from_arrays(
        [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        [0.7, 1.1, 2.5],
        [-12.0, 30.5, 4.0],
    )
    .expect("rotation is a valid direction")
}

#[test]
fn axial_slice_of_ramp_uses_two_color_map() {
    init_logger();
    let color_map = ColorMap::two_color(Rgba([0, 0, 255, 255]), Rgba([255, 0, 0, 255]));
    let policy = DisplayMappingPolicy::continuous(Some(IntensityCurve::identity()), color_map.clone());
    let mut wrapper = TypedImageWrapper::new(
        ScalarStorage::new(ramp_u8(4, 4, 4)).unwrap(),
        ImageGeometry::default(),
        NativeIntensityMapping::Identity,
        policy,
    )
    .unwrap();

    wrapper.set_slice_index([2, 2, 2]).unwrap();
    let slice = wrapper.display_slice(DisplayAxis::Axial).unwrap();
    assert_eq!(slice.dimensions(), (4, 4));
    assert_eq!(wrapper.voxel_as_f64([2, 2, 2]).unwrap(), 42.0);
    assert_eq!(*slice.get_pixel(2, 2), color_map.map(42.0 / 63.0));
    assert_eq!(*slice.get_pixel(2, 2), Rgba([170, 0, 85, 255]));
}

#[test]
fn index_equal_to_size_is_out_of_bounds() {
    let wrapper = ramp_wrapper();
    assert!(matches!(
        wrapper.voxel_as_f64([4, 0, 0]),
        Err(WrapperError::OutOfBounds { .. })
    ));
    assert!(matches!(
        wrapper.voxel_components_as_f64([0, 0, 4]),
        Err(WrapperError::OutOfBounds { .. })
    ));
    assert!(matches!(
        wrapper.voxel_as_f64_at([0.0, 3.6, 0.0]),
        Err(WrapperError::OutOfBounds { .. })
    ));
    assert_eq!(wrapper.voxel_as_f64_at([0.0, 3.4, 0.0]).unwrap(), 12.0);
}

#[test]
fn repeated_slice_requests_are_identical() {
    let mut wrapper = ramp_wrapper();
    for axis in DisplayAxis::ALL {
        for i in 0..4 {
            wrapper.set_slice_index([i, 3 - i, i]).unwrap();
            let first = wrapper.display_slice(axis).unwrap();
            let second = wrapper.display_slice(axis).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(first.as_raw(), second.as_raw());
        }
    }
}

#[test]
fn clamped_slice_index_matches_direct_index() {
    let mut clamped = ramp_wrapper();
    clamped.set_slice_index([1, 99, usize::MAX]).unwrap();
    assert_eq!(clamped.slice_index().unwrap(), [1, 3, 3]);

    let mut direct = ramp_wrapper();
    direct.set_slice_index([1, 3, 3]).unwrap();
    for axis in DisplayAxis::ALL {
        assert_eq!(
            clamped.display_slice(axis).unwrap().as_raw(),
            direct.display_slice(axis).unwrap().as_raw()
        );
    }
}

#[test]
fn nifti_round_trip_is_identity() {
    let wrapper = ScalarImageWrapper::from_array(ramp_u8(4, 3, 2), oblique_geometry()).unwrap();
    for z in 0..2 {
        for y in 0..3 {
            for x in 0..4 {
                let index = [x as f64, y as f64, z as f64];
                let nifti = wrapper.transform_voxel_index_to_nifti_coordinates(index).unwrap();
                let back = wrapper.transform_nifti_coordinates_to_voxel_index(nifti).unwrap();
                assert_close(back, index, 1e-9);
            }
        }
    }
}

#[test]
fn nifti_sform_matches_point_transform() {
    let wrapper = ScalarImageWrapper::from_array(ramp_u8(4, 3, 2), oblique_geometry()).unwrap();
    let sform = wrapper.nifti_sform().unwrap();
    let p = sform * nalgebra::Vector4::new(3.0, 1.0, 1.0, 1.0);
    let nifti = wrapper
        .transform_voxel_index_to_nifti_coordinates([3.0, 1.0, 1.0])
        .unwrap();
    assert_close([p.x, p.y, p.z], nifti, 1e-9);
    let physical = wrapper.transform_voxel_index_to_position([3, 1, 1]).unwrap();
    assert_close([-physical[0], -physical[1], physical[2]], nifti, 1e-9);
}

#[test]
fn coordinate_transforms_accept_indices_outside_the_region() {
    let mut wrapper = ramp_wrapper();
    assert_eq!(
        wrapper.transform_voxel_index_to_position([10, 0, 7]).unwrap(),
        [10.0, 0.0, 7.0]
    );
    assert_eq!(
        wrapper.transform_voxel_index_to_nifti_coordinates([-1.0, 4.0, 9.5]).unwrap(),
        [1.0, -4.0, 9.5]
    );
    assert!(matches!(
        wrapper.voxel_as_f64([10, 0, 7]),
        Err(WrapperError::OutOfBounds { .. })
    ));

    wrapper.reset();
    assert!(matches!(
        wrapper.transform_voxel_index_to_position([0, 0, 0]),
        Err(WrapperError::NotInitialized)
    ));
}

#[test]
fn histogram_counts_every_voxel_once() {
    init_logger();
    let mut wrapper = ramp_wrapper();
    for bins in [1, 7, 8, 64, 100] {
        let histogram = wrapper.histogram(bins).unwrap();
        assert_eq!(histogram.total(), 64);
        assert_eq!(histogram.counts().iter().sum::<u64>(), 64);
    }
    let histogram = wrapper.histogram(8).unwrap();
    assert!(histogram.counts().iter().all(|&c| c == 8));
    assert!(Arc::ptr_eq(&histogram, &wrapper.histogram(8).unwrap()));
}

#[test]
fn vector_histogram_counts_every_voxel_once() {
    let mut wrapper = VectorImageWrapper::from_array(rgb_f32(3, 4, 5), ImageGeometry::default()).unwrap();
    for representation in [
        ScalarRepresentation::Component(1),
        ScalarRepresentation::Magnitude,
        ScalarRepresentation::Max,
        ScalarRepresentation::Average,
    ] {
        wrapper.set_scalar_representation(representation).unwrap();
        assert_eq!(wrapper.histogram(16).unwrap().total(), 60);
    }
}

#[test]
fn representation_round_trip_restores_common_format() {
    init_logger();
    let modes = [
        ScalarRepresentation::Component(0),
        ScalarRepresentation::Component(2),
        ScalarRepresentation::Magnitude,
        ScalarRepresentation::Max,
        ScalarRepresentation::Average,
    ];
    for original in modes {
        let mut untouched = VectorImageWrapper::from_array(rgb_f32(3, 4, 5), ImageGeometry::default()).unwrap();
        untouched.set_scalar_representation(original).unwrap();
        let expected = untouched.common_format_image(ExportChannel::WholeImage).unwrap();

        for other in modes {
            let mut switched =
                VectorImageWrapper::from_array(rgb_f32(3, 4, 5), ImageGeometry::default()).unwrap();
            switched.set_scalar_representation(original).unwrap();
            switched.common_format_image(ExportChannel::WholeImage).unwrap();
            switched.set_scalar_representation(other).unwrap();
            switched.common_format_image(ExportChannel::WholeImage).unwrap();
            switched.set_scalar_representation(original).unwrap();
            let restored = switched.common_format_image(ExportChannel::WholeImage).unwrap();
            assert_eq!(*restored, *expected);
        }
    }
}

#[test]
fn preview_channel_follows_slice_index() {
    let mut wrapper = ramp_wrapper();
    wrapper.set_slice_index([1, 1, 1]).unwrap();
    let before = wrapper.common_format_image(ExportChannel::PreviewZ).unwrap();
    assert_eq!(before.region().size, [4, 4, 1]);
    assert_eq!(before.value([2, 3, 1]), Some(30.0));
    assert_eq!(before.value([2, 3, 2]), None);

    wrapper.set_slice_index([3, 1, 1]).unwrap();
    let same = wrapper.common_format_image(ExportChannel::PreviewZ).unwrap();
    assert!(Arc::ptr_eq(&before, &same));

    wrapper.set_slice_index([3, 1, 2]).unwrap();
    let after = wrapper.common_format_image(ExportChannel::PreviewZ).unwrap();
    assert_eq!(after.value([2, 3, 2]), Some(46.0));
}

#[test]
fn negative_native_scale_swaps_extrema() {
    let image = NativeImage::from_voxels([2, 1, 1], 1, &[10i16, 30], ImageGeometry::default())
        .with_native_mapping(NativeIntensityMapping::Linear { scale: -2.0, shift: 5.0 });
    let mut wrapper = image.into_wrapper(DisplayMappingPolicy::default()).unwrap();
    assert_eq!(wrapper.image_min_as_f64().unwrap(), 10.0);
    assert_eq!(wrapper.image_min_native().unwrap(), -55.0);
    assert_eq!(wrapper.image_max_native().unwrap(), -15.0);
    assert_eq!(wrapper.image_scale_factor(), -2.0);
    assert_eq!(wrapper.voxel_mapped_to_native([1, 0, 0]).unwrap(), -55.0);
}

#[test]
fn label_slice_colors_by_table() {
    let table = Arc::new(ColorLabelTable::with_default_labels());
    let mut wrapper = LabelImageWrapper::labels(halves_u16(4, 2, 2), ImageGeometry::default(), Arc::clone(&table)).unwrap();
    wrapper.set_alpha(128);
    let slice = wrapper.display_slice(DisplayAxis::Axial).unwrap();
    let left = table.label(1).unwrap();
    let right = table.label(2).unwrap();
    let expected_alpha = ((left.alpha as u16 * 128 + 127) / 255) as u8;
    assert_eq!(slice.get_pixel(0, 0).0[..3], left.color);
    assert_eq!(slice.get_pixel(0, 0).0[3], expected_alpha);
    assert_eq!(slice.get_pixel(3, 1).0[..3], right.color);
    assert!(matches!(
        wrapper.set_color_map(ColorMap::default()),
        Err(WrapperError::UnsupportedMapping(_))
    ));
}

#[test]
fn hidden_layer_is_transparent() {
    let mut wrapper = ramp_wrapper();
    let shown = wrapper.display_slice(DisplayAxis::Coronal).unwrap();
    wrapper.toggle_visibility();
    let hidden = wrapper.display_slice(DisplayAxis::Coronal).unwrap();
    assert!(!Arc::ptr_eq(&shown, &hidden));
    assert!(hidden.pixels().all(|p| p.0[3] == 0));
    assert_eq!(wrapper.voxel_under_cursor_appearance().unwrap().0[3], 0);
}

#[test]
fn float_volume_with_nan_and_infinity_renders() {
    init_logger();
    let mut data = ramp_u8(4, 4, 4).mapv(f32::from);
    data[[1, 1, 1]] = f32::NAN;
    data[[0, 1, 1]] = f32::INFINITY;
    let mut wrapper = ScalarImageWrapper::from_array(data, ImageGeometry::default()).unwrap();
    for axis in DisplayAxis::ALL {
        for i in 0..4 {
            wrapper.set_slice_index([i, i, i]).unwrap();
            let slice = wrapper.display_slice(axis).unwrap();
            assert!(slice.pixels().all(|p| p.0[3] == 255));
        }
    }
    wrapper.set_slice_index([1, 1, 0]).unwrap();
    assert_eq!(wrapper.voxel_under_cursor_appearance().unwrap(), Rgba([255, 255, 255, 255]));
    wrapper.set_slice_index([1, 1, 1]).unwrap();
    assert_eq!(wrapper.voxel_under_cursor_appearance().unwrap(), Rgba([0, 0, 0, 255]));
}

#[test]
fn rgb_layer_shows_components_as_colors() {
    let mut wrapper = VectorImageWrapper::rgb(rgb_f32(3, 4, 5), ImageGeometry::default()).unwrap();
    // components span [-1.5, 9]: x, y * y and z - 1.5
    wrapper.set_slice_index([2, 3, 4]).unwrap();
    let slice = wrapper.display_slice(DisplayAxis::Axial).unwrap();
    assert_eq!(*slice.get_pixel(2, 3), wrapper.display_mapping().map_rgb([2.0, 9.0, 2.5], (-1.5, 9.0)));
    assert_eq!(slice.get_pixel(2, 3).0[1], 255);
    assert_eq!(wrapper.voxel_under_cursor_displayed_value().unwrap(), vec![2.0, 9.0, 2.5]);
}

#[test]
fn thumbnail_is_written_to_disk() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thumb.png");
    let mut wrapper = ScalarImageWrapper::from_array(ramp_u8(16, 8, 2), ImageGeometry::default()).unwrap();
    wrapper.write_thumbnail(&path, 4).unwrap();

    let written = image::open(&path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (4, 2));
}

#[test]
fn boxed_wrappers_share_one_interface() {
    let table = Arc::new(ColorLabelTable::with_default_labels());
    let mut layers: Vec<Box<dyn ImageWrapper>> = vec![
        Box::new(ramp_wrapper()),
        Box::new(VectorImageWrapper::from_array(rgb_f32(4, 4, 4), ImageGeometry::default()).unwrap()),
        Box::new(LabelImageWrapper::labels(halves_u16(4, 4, 4), ImageGeometry::default(), table).unwrap()),
    ];
    let ids: Vec<_> = layers.iter().map(|l| l.unique_id()).collect();
    assert!(ids.windows(2).all(|w| w[0] != w[1]));
    for layer in &mut layers {
        assert_eq!(layer.size().unwrap(), [4, 4, 4]);
        let slice = layer.display_slice(DisplayAxis::Sagittal).unwrap();
        assert_eq!(slice.dimensions(), (4, 4));
        let version = layer.version();
        layer.reset();
        assert!(layer.version() > version);
        assert!(matches!(layer.display_slice(DisplayAxis::Axial), Err(WrapperError::NotInitialized)));
    }
}
