//! The fixed checklist for Buildroot-style embedded rootfs images.
//!
//! # DO NOT RELAX THESE TO MAKE A BUILD PASS
//!
//! If a check fails, the image is missing something the device needs at
//! boot (udev, kmod, blkid, init, a shell). Fix the image.

use super::{CheckDef, CheckKind};

/// Required checks, in report order.
pub const REQUIRED_CHECKS: &[CheckDef] = &[
    CheckDef {
        name: "udevadm_present",
        groups: &[&["bin/udevadm"], &["sbin/udevadm"]],
        kind: CheckKind::AnyOf,
    },
    CheckDef {
        name: "udev_rules_or_etc",
        groups: &[&["etc/udev"], &["lib/udev/rules.d"]],
        kind: CheckKind::AnyOf,
    },
    CheckDef {
        name: "libkmod_present",
        groups: &[
            &["lib/libkmod.so"],
            &["lib/libkmod.so.2"],
            &["lib/libkmod.so.2.3.7"],
            &["lib32/libkmod.so"],
            &["lib32/libkmod.so.2"],
            &["lib64/libkmod.so"],
            &["lib64/libkmod.so.2"],
        ],
        kind: CheckKind::AnyOf,
    },
    CheckDef {
        name: "libblkid_present",
        groups: &[
            &["lib/libblkid.so"],
            &["lib32/libblkid.so"],
            &["lib64/libblkid.so"],
        ],
        kind: CheckKind::AnyOf,
    },
    CheckDef {
        name: "init_script_S10udev",
        groups: &[&["etc/init.d/S10udev"]],
        kind: CheckKind::AnyOf,
    },
    CheckDef {
        name: "sbin_init_executable",
        groups: &[&["sbin/init"]],
        kind: CheckKind::MustBeExecutable { path: "sbin/init" },
    },
    CheckDef {
        name: "busybox_executable",
        groups: &[&["bin/busybox"], &["usr/bin/busybox"], &["sbin/busybox"]],
        kind: CheckKind::AnyExecutable,
    },
];

/// Board extras whose presence is reported but never fails a run.
pub const OPTIONAL_PRESENCE: &[&str] = &[
    "etc/init.d/S50usbdevice",
    "etc/init.d/S99_auto_reboot",
    "linuxrc",
    "rockchip_test",
];
