//! Sony sm8250-common blob configuration

use crate::blob_fixup::add_gettid;
use crate::blob_fixup::BlobFixup;
use crate::blob_fixup::BlobFixupRule;
use crate::error::ConfigError;
use crate::lib_fixup::LibFixup;
use crate::lib_fixup::LibFixupRule;

use super::ExtractModule;

const NAMESPACE_IMPORTS: &[&str] = &[
    "hardware/qcom-caf/sm8250",
    "hardware/qcom-caf/wlan",
    "hardware/sony",
    "vendor/qcom/opensource/commonsys/display",
    "vendor/qcom/opensource/commonsys-intf/display",
    "vendor/qcom/opensource/dataservices",
    "vendor/qcom/opensource/display",
];

/// Shared protobuf 3.9.1 builds that need the vendorcompat variant in vendor
pub const LIBS_PROTO_3_9_1: &[&str] = &["libprotobuf-cpp-lite-3.9.1", "libprotobuf-cpp-full-3.9.1"];

const LIBS_ADD_VENDOR_SUFFIX: &[&str] = &[
    "vendor.somc.hardware.miscta@1.0",
    "com.qualcomm.qti.dpm.api@1.0",
    "libmmosal",
    "vendor.qti.hardware.fm@1.0",
    "vendor.qti.hardware.tui_comm@1.0",
    "vendor.qti.hardware.wifidisplaysession@1.0",
    "com.qualcomm.qti.imscmservice@1.0",
    "com.qualcomm.qti.imscmservice@2.0",
    "com.qualcomm.qti.imscmservice@2.1",
    "com.qualcomm.qti.imscmservice@2.2",
    "com.qualcomm.qti.uceservice@2.0",
    "com.qualcomm.qti.uceservice@2.1",
    "vendor.qti.hardware.data.cne.internal.api@1.0",
    "vendor.qti.hardware.data.cne.internal.constants@1.0",
    "vendor.qti.hardware.data.cne.internal.server@1.0",
    "vendor.qti.hardware.data.connection@1.0",
    "vendor.qti.hardware.data.connection@1.1",
    "vendor.qti.hardware.data.dynamicdds@1.0",
    "vendor.qti.hardware.data.iwlan@1.0",
    "vendor.qti.hardware.data.qmi@1.0",
    "vendor.qti.hardware.qseecom@1.0",
    "vendor.qti.ims.callinfo@1.0",
    "vendor.qti.ims.rcsconfig@1.0",
    "vendor.qti.ims.rcsconfig@1.1",
    "vendor.qti.imsrtpservice@3.0",
];

// Replaced by open-source builds in the target tree
const LIBS_REMOVE: &[&str] = &[
    "libOmxCore",
    "libplatformconfig",
    "libwpa_client",
    "libwfdaac_vendor",
    "libc2dcolorconvert",
    "libril",
];

const LIBS_V32: &[&str] = &["libhidlbase-v32", "libbinder-v32", "libutils-v32"];

fn lib_fixups() -> Vec<LibFixupRule> {
    vec![
        LibFixupRule::new(
            "libs_proto_3_9_1",
            LIBS_PROTO_3_9_1.iter().copied(),
            LibFixup::VendorCompat,
        ),
        LibFixupRule::new(
            "libs_add_vendor_suffix",
            LIBS_ADD_VENDOR_SUFFIX.iter().copied(),
            LibFixup::VendorSuffix,
        ),
        LibFixupRule::new("libs_remove", LIBS_REMOVE.iter().copied(), LibFixup::Remove),
        LibFixupRule::new(
            "libs_v32",
            LIBS_V32.iter().copied(),
            LibFixup::StripSuffix("-v32".to_string()),
        ),
    ]
}

fn blob_fixups() -> Vec<BlobFixupRule> {
    BlobFixupRule::numbered([
        (
            vec![
                "system_ext/lib64/libwfdnative.so",
                "vendor/lib64/libvpplibrary.so",
                "vendor/lib64/libswiqisettinghelper.so",
                "vendor/lib64/vendor.somc.hardware.swiqi@1.0-impl.so",
            ],
            BlobFixup::new().replace_needed("android.hidl.base@1.0.so", "libhidlbase.so"),
        ),
        (
            vec!["product/lib64/libdpmframework.so"],
            BlobFixup::new().replace_needed("libhidltransport.so", "libcutils-v29.so"),
        ),
        (
            vec!["vendor/lib64/vendor.semc.hardware.extlight-V1-ndk_platform.so"],
            BlobFixup::new().replace_needed(
                "android.hardware.light-V1-ndk_platform.so",
                "android.hardware.light-V1-ndk.so",
            ),
        ),
        (
            vec![
                "vendor/lib64/vendor.somc.camera.device@3.2-impl.so",
                "vendor/lib64/vendor.somc.camera.device@3.3-impl.so",
                "vendor/lib64/vendor.somc.camera.device@3.4-impl.so",
                "vendor/lib64/vendor.somc.camera.device@3.5-impl.so",
                "vendor/bin/hw/vendor.somc.hardware.camera.provider@1.0-service",
            ],
            BlobFixup::new()
                .replace_needed("libutils.so", "libutils-v32.so")
                .replace_needed("libhidlbase.so", "libhidlbase-v32.so")
                .replace_needed("libbinder.so", "libbinder-v32.so")
                .add_needed("libbinder-v32.so"),
        ),
        (
            vec!["vendor/lib/libiVptApi.so", "vendor/lib64/libiVptApi.so"],
            BlobFixup::new().add_needed("libiVptLibC.so"),
        ),
        (
            vec![
                "vendor/lib/libiVptLibC.so",
                "vendor/lib/libHpEqApi.so",
                "vendor/lib64/libiVptLibC.so",
                "vendor/lib64/libHpEqApi.so",
            ],
            BlobFixup::new()
                .add_needed("libcrypto.so")
                .add_needed("libiVptHkiDec.so"),
        ),
        (
            vec![
                "vendor/lib/libwvhidl.so",
                "vendor/lib64/libwvhidl.so",
                "vendor/lib/mediadrm/libwvdrmengine.so",
                "vendor/lib64/mediadrm/libwvdrmengine.so",
            ],
            BlobFixup::new().add_needed("libcrypto_shim.so"),
        ),
        (
            vec!["vendor/etc/seccomp_policy/atfwd@2.0.policy"],
            BlobFixup::new().call("add_gettid", add_gettid),
        ),
    ])
}

/// The Sony sm8250-common module
pub fn sm8250_common() -> Result<ExtractModule, ConfigError> {
    ExtractModule::builder("sm8250-common", "sony")
        .namespace_imports(NAMESPACE_IMPORTS.iter().copied())
        .lib_fixups(lib_fixups())
        .blob_fixups(blob_fixups())
        .provided_libs([
            "libcutils-v29.so",
            "libcrypto_shim.so",
            "android.hardware.light-V1-ndk.so",
        ])
        .check_elf(true)
        .build()
}
