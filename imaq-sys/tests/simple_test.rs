// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Smoke tests for the hand-maintained NI-IMAQ declarations.

/// Attribute identifiers all live above the driver's attribute base.
#[test]
fn attribute_ids_are_offsets_from_the_base() {
    for attribute in [
        imaq_sys::IMG_ATTR_BITSPERPIXEL,
        imaq_sys::IMG_ATTR_BYTESPERPIXEL,
        imaq_sys::IMG_ATTR_ROI_WIDTH,
        imaq_sys::IMG_ATTR_ROI_HEIGHT,
        imaq_sys::IMG_ATTR_NUM_PORTS,
    ] {
        assert!(attribute > imaq_sys::_IMG_BASE);
    }
    assert_eq!(imaq_sys::IMG_ERR_GOOD, 0);
}

/// Loading a library that does not exist reports a libloading error.
#[test]
fn loading_missing_library_fails() {
    let result = unsafe { imaq_sys::libimaq::new("libimaq-does-not-exist.so") };
    assert!(result.is_err());
}
