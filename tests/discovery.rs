//! End-to-end discovery scenarios over real release asset listings.

use distillery::core::asset::{Asset, SignatureType};
use distillery::core::discover::{discover, DiscoverError, DiscoverOptions, Discovery};
use distillery::core::platform::Platform;

struct Expected {
    binary: &'static str,
    checksum: Option<&'static str>,
    signature: Option<&'static str>,
    key: Option<&'static str>,
}

fn run_discovery(
    filenames: &[&str],
    os: &str,
    arch: &str,
    term: &str,
    version: &str,
) -> (Vec<Asset>, Result<Discovery, DiscoverError>) {
    let mut assets: Vec<Asset> = filenames
        .iter()
        .map(|name| Asset::new(name, name, os, arch, version))
        .collect();
    let platform = Platform::new(os, arch);
    let opts = DiscoverOptions {
        terms: vec![term.to_string()],
        version: version.to_string(),
        skip_score_check: false,
    };
    let result = discover(&mut assets, &platform, &opts);
    (assets, result)
}

fn assert_selection(
    filenames: &[&str],
    os: &str,
    arch: &str,
    term: &str,
    version: &str,
    expected: Expected,
) {
    let (assets, result) = run_discovery(filenames, os, arch, term, version);
    let d = result.unwrap_or_else(|e| panic!("{term} {os}/{arch}: discovery failed: {e}"));

    assert_eq!(
        assets[d.binary].name, expected.binary,
        "{term} {os}/{arch}: binary"
    );
    assert_eq!(
        d.checksum.map(|i| assets[i].name.as_str()),
        expected.checksum,
        "{term} {os}/{arch}: checksum"
    );
    assert_eq!(
        d.signature.map(|i| assets[i].name.as_str()),
        expected.signature,
        "{term} {os}/{arch}: signature"
    );
    assert_eq!(
        d.key.map(|i| assets[i].name.as_str()),
        expected.key,
        "{term} {os}/{arch}: key"
    );
}

const PULUMI_ASSETS: &[&str] = &[
    "B3SUMS",
    "B3SUMS.sig",
    "pulumi-3.133.0-checksums.txt",
    "pulumi-3.133.0-checksums.txt.sig",
    "pulumi-v3.133.0-darwin-arm64.tar.gz",
    "pulumi-v3.133.0-darwin-arm64.tar.gz.sig",
    "pulumi-v3.133.0-darwin-x64.tar.gz",
    "pulumi-v3.133.0-darwin-x64.tar.gz.sig",
    "pulumi-v3.133.0-linux-arm64.tar.gz",
    "pulumi-v3.133.0-linux-arm64.tar.gz.sig",
    "pulumi-v3.133.0-linux-x64.tar.gz",
    "pulumi-v3.133.0-linux-x64.tar.gz.sig",
    "pulumi-v3.133.0-windows-arm64.zip",
    "pulumi-v3.133.0-windows-arm64.zip.sig",
    "pulumi-v3.133.0-windows-x64.zip",
    "pulumi-v3.133.0-windows-x64.zip.sig",
    "sdk-nodejs-pulumi-pulumi-3.133.0.tgz",
    "sdk-nodejs-pulumi-pulumi-3.133.0.tgz.sig",
    "sdk-python-pulumi-3.133.0-py3-none-any.whl",
    "sdk-python-pulumi-3.133.0-py3-none-any.whl.sig",
    "SHA512SUMS",
    "SHA512SUMS.sig",
];

#[test]
fn pulumi_linux_amd64() {
    assert_selection(
        PULUMI_ASSETS,
        "linux",
        "amd64",
        "pulumi",
        "3.133.0",
        Expected {
            binary: "pulumi-v3.133.0-linux-x64.tar.gz",
            checksum: Some("pulumi-3.133.0-checksums.txt"),
            signature: Some("pulumi-v3.133.0-linux-x64.tar.gz.sig"),
            key: None,
        },
    );
}

#[test]
fn pulumi_other_platforms() {
    for (os, arch, binary) in [
        ("darwin", "amd64", "pulumi-v3.133.0-darwin-x64.tar.gz"),
        ("darwin", "arm64", "pulumi-v3.133.0-darwin-arm64.tar.gz"),
        ("linux", "arm64", "pulumi-v3.133.0-linux-arm64.tar.gz"),
        ("windows", "amd64", "pulumi-v3.133.0-windows-x64.zip"),
    ] {
        let (assets, result) = run_discovery(PULUMI_ASSETS, os, arch, "pulumi", "3.133.0");
        let d = result.unwrap();
        assert_eq!(assets[d.binary].name, binary, "{os}/{arch}");
        assert_eq!(
            d.checksum.map(|i| assets[i].name.as_str()),
            Some("pulumi-3.133.0-checksums.txt"),
            "{os}/{arch}"
        );
    }
}

const COSIGN_ASSETS: &[&str] = &[
    "cosign-2.4.0-1.aarch64.rpm",
    "cosign-2.4.0-1.aarch64.rpm-keyless.pem",
    "cosign-2.4.0-1.aarch64.rpm-keyless.sig",
    "cosign-2.4.0-1.x86_64.rpm",
    "cosign-2.4.0-1.x86_64.rpm-keyless.pem",
    "cosign-2.4.0-1.x86_64.rpm-keyless.sig",
    "cosign-darwin-amd64",
    "cosign-darwin-amd64-keyless.pem",
    "cosign-darwin-amd64-keyless.sig",
    "cosign-darwin-amd64.sig",
    "cosign-darwin-amd64_2.4.0_darwin_amd64.sbom.json",
    "cosign-darwin-arm64",
    "cosign-darwin-arm64-keyless.pem",
    "cosign-darwin-arm64-keyless.sig",
    "cosign-darwin-arm64.sig",
    "cosign-darwin-arm64_2.4.0_darwin_arm64.sbom.json",
    "cosign-linux-amd64",
    "cosign-linux-amd64-keyless.pem",
    "cosign-linux-amd64-keyless.sig",
    "cosign-linux-amd64.sig",
    "cosign-linux-amd64_2.4.0_linux_amd64.sbom.json",
    "cosign-linux-arm64",
    "cosign-linux-arm64-keyless.pem",
    "cosign-linux-arm64-keyless.sig",
    "cosign-linux-arm64.sig",
    "cosign-linux-arm64_2.4.0_linux_arm64.sbom.json",
    "cosign-linux-pivkey-pkcs11key-amd64",
    "cosign-linux-pivkey-pkcs11key-amd64-keyless.pem",
    "cosign-linux-pivkey-pkcs11key-amd64-keyless.sig",
    "cosign-linux-pivkey-pkcs11key-amd64.sig",
    "cosign-windows-amd64.exe",
    "cosign-windows-amd64.exe-keyless.pem",
    "cosign-windows-amd64.exe-keyless.sig",
    "cosign-windows-amd64.exe.sig",
    "cosign_2.4.0_amd64.deb",
    "cosign_2.4.0_amd64.deb-keyless.pem",
    "cosign_2.4.0_amd64.deb-keyless.sig",
    "cosign_2.4.0_arm64.deb",
    "cosign_2.4.0_arm64.deb-keyless.pem",
    "cosign_2.4.0_arm64.deb-keyless.sig",
    "cosign_2.4.0_x86_64.apk",
    "cosign_2.4.0_x86_64.apk-keyless.pem",
    "cosign_2.4.0_x86_64.apk-keyless.sig",
    "cosign_checksums.txt",
    "cosign_checksums.txt-keyless.pem",
    "cosign_checksums.txt-keyless.sig",
    "release-cosign.pub",
];

#[test]
fn cosign_darwin_arm64() {
    assert_selection(
        COSIGN_ASSETS,
        "darwin",
        "arm64",
        "cosign",
        "2.4.0",
        Expected {
            binary: "cosign-darwin-arm64",
            checksum: Some("cosign_checksums.txt"),
            signature: Some("cosign-darwin-arm64.sig"),
            key: Some("release-cosign.pub"),
        },
    );
}

#[test]
fn cosign_other_platforms() {
    for (os, arch, binary, signature) in [
        (
            "darwin",
            "amd64",
            "cosign-darwin-amd64",
            "cosign-darwin-amd64.sig",
        ),
        (
            "linux",
            "amd64",
            "cosign-linux-amd64",
            "cosign-linux-amd64.sig",
        ),
        (
            "linux",
            "arm64",
            "cosign-linux-arm64",
            "cosign-linux-arm64.sig",
        ),
        (
            "windows",
            "amd64",
            "cosign-windows-amd64.exe",
            "cosign-windows-amd64.exe.sig",
        ),
    ] {
        let (assets, result) = run_discovery(COSIGN_ASSETS, os, arch, "cosign", "2.4.0");
        let d = result.unwrap();
        assert_eq!(assets[d.binary].name, binary, "{os}/{arch}");
        assert_eq!(
            d.signature.map(|i| assets[i].name.as_str()),
            Some(signature),
            "{os}/{arch}"
        );
        assert_eq!(
            d.checksum.map(|i| assets[i].name.as_str()),
            Some("cosign_checksums.txt"),
            "{os}/{arch}"
        );
        assert_eq!(
            d.key.map(|i| assets[i].name.as_str()),
            Some("release-cosign.pub"),
            "{os}/{arch}"
        );
    }
}

const ACORN_ASSETS: &[&str] = &[
    "acorn-v0.10.1-linux-amd64.tar.gz",
    "acorn-v0.10.1-linux-arm64.tar.gz",
    "acorn-v0.10.1-macOS-universal.tar.gz",
    "acorn-v0.10.1-macOS-universal.zip",
    "acorn-v0.10.1-windows-amd64.zip",
];

#[test]
fn acorn_darwin_amd64_universal() {
    assert_selection(
        ACORN_ASSETS,
        "darwin",
        "amd64",
        "acorn",
        "0.10.1",
        Expected {
            binary: "acorn-v0.10.1-macOS-universal.tar.gz",
            checksum: None,
            signature: None,
            key: None,
        },
    );
}

#[test]
fn acorn_other_platforms() {
    for (os, arch, binary) in [
        ("darwin", "arm64", "acorn-v0.10.1-macOS-universal.tar.gz"),
        ("linux", "amd64", "acorn-v0.10.1-linux-amd64.tar.gz"),
        ("linux", "arm64", "acorn-v0.10.1-linux-arm64.tar.gz"),
        ("windows", "amd64", "acorn-v0.10.1-windows-amd64.zip"),
    ] {
        let (assets, result) = run_discovery(ACORN_ASSETS, os, arch, "acorn", "0.10.1");
        let d = result.unwrap();
        assert_eq!(assets[d.binary].name, binary, "{os}/{arch}");
    }
}

const NERDCTL_ASSETS: &[&str] = &[
    "nerdctl-1.7.7-freebsd-amd64.tar.gz",
    "nerdctl-1.7.7-linux-amd64.tar.gz",
    "nerdctl-1.7.7-linux-arm-v7.tar.gz",
    "nerdctl-1.7.7-linux-arm64.tar.gz",
    "nerdctl-1.7.7-windows-amd64.tar.gz",
    "nerdctl-full-1.7.7-linux-amd64.tar.gz",
    "SHA256SUMS",
    "SHA256SUMS.asc",
];

#[test]
fn nerdctl_darwin_has_no_matching_asset() {
    let (_, result) = run_discovery(NERDCTL_ASSETS, "darwin", "amd64", "nerdctl", "1.7.7");
    match result {
        Err(DiscoverError::NoMatchingAsset { closest: Some(c) }) => {
            assert!(c.value < 40, "closest score should be reported: {c:?}");
        }
        other => panic!("expected NoMatchingAsset, got {other:?}"),
    }
}

#[test]
fn nerdctl_linux_still_resolves() {
    let (assets, result) = run_discovery(NERDCTL_ASSETS, "linux", "amd64", "nerdctl", "1.7.7");
    let d = result.unwrap();
    assert_eq!(assets[d.binary].name, "nerdctl-1.7.7-linux-amd64.tar.gz");
    assert_eq!(
        d.checksum.map(|i| assets[i].name.as_str()),
        Some("SHA256SUMS")
    );
    // The armored signature gets a synthesized .pub sibling.
    assert_eq!(
        d.signature.map(|i| assets[i].name.as_str()),
        Some("SHA256SUMS.asc")
    );
    assert_eq!(
        d.key.map(|i| assets[i].name.as_str()),
        Some("SHA256SUMS.pub")
    );
}

const DISTILLERY_ASSETS: &[&str] = &[
    "checksums.txt",
    "checksums.txt.pem",
    "checksums.txt.sig",
    "distillery-v1.0.0-beta.5-darwin-amd64.tar.gz",
    "distillery-v1.0.0-beta.5-darwin-arm64.tar.gz",
    "distillery-v1.0.0-beta.5-linux-amd64.tar.gz",
    "distillery-v1.0.0-beta.5-linux-arm64.tar.gz",
    "distillery-v1.0.0-beta.5-windows-amd64.zip",
];

#[test]
fn distillery_keyless_bundle() {
    let (assets, result) = run_discovery(
        DISTILLERY_ASSETS,
        "darwin",
        "amd64",
        "distillery",
        "1.0.0-beta.5",
    );
    let d = result.unwrap();
    assert_eq!(
        assets[d.binary].name,
        "distillery-v1.0.0-beta.5-darwin-amd64.tar.gz"
    );
    assert_eq!(
        d.checksum.map(|i| assets[i].name.as_str()),
        Some("checksums.txt")
    );
    assert_eq!(
        d.signature.map(|i| assets[i].name.as_str()),
        Some("checksums.txt.sig")
    );
    assert_eq!(
        d.key.map(|i| assets[i].name.as_str()),
        Some("checksums.txt.pem")
    );
    assert_eq!(d.signature_type, SignatureType::Checksum);
}

const GITLAB_RUNNER_ASSETS: &[&str] = &[
    "gitlab-runner-darwin-amd64",
    "gitlab-runner-darwin-arm64",
    "gitlab-runner-linux-amd64",
    "gitlab-runner-windows-amd64.exe",
    "release.sha256",
    "release.sha256.asc",
];

#[test]
fn gitlab_runner_synthesizes_gpg_key() {
    let (assets, result) = run_discovery(
        GITLAB_RUNNER_ASSETS,
        "darwin",
        "amd64",
        "gitlab-runner",
        "16.11.4",
    );
    let d = result.unwrap();
    assert_eq!(assets[d.binary].name, "gitlab-runner-darwin-amd64");
    assert_eq!(
        d.checksum.map(|i| assets[i].name.as_str()),
        Some("release.sha256")
    );
    assert_eq!(
        d.signature.map(|i| assets[i].name.as_str()),
        Some("release.sha256.asc")
    );
    assert_eq!(
        d.key.map(|i| assets[i].name.as_str()),
        Some("release.sha256.pub")
    );
    assert_eq!(d.signature_type, SignatureType::Checksum);
}
