//! Kubernetes release binaries (dl.k8s.io).
//!
//! Kubernetes does not publish per-platform asset listings; the binary and
//! its `.sha256` sidecar live at well-known URLs. Asset names are
//! synthesized with the platform tokens embedded so they score like any
//! other release.

use super::{log_release, version_from_tag, AssetRef, Release, SourceError};
use crate::core::platform::Platform;

const DL_BASE: &str = "https://dl.k8s.io";

pub async fn find_release(
    client: &reqwest::Client,
    component: &str,
    version: &str,
    platform: &Platform,
) -> Result<Release, SourceError> {
    let tag = if version == crate::VERSION_LATEST {
        let stable = client
            .get(format!("{DL_BASE}/release/stable.txt"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        stable.trim().to_string()
    } else {
        format!("v{}", version_from_tag(version))
    };
    let version = version_from_tag(&tag);

    let binary = if platform.os == "windows" {
        format!("{component}.exe")
    } else {
        component.to_string()
    };
    let base_url = format!(
        "{DL_BASE}/release/{tag}/bin/{}/{}/{binary}",
        platform.os, platform.arch
    );

    let asset_name = format!("{component}-{version}-{}-{}", platform.os, platform.arch);
    let release = Release {
        tag,
        version,
        pre_release: false,
        assets: vec![
            AssetRef {
                name: asset_name.clone(),
                size: 0,
                url: base_url.clone(),
            },
            AssetRef {
                name: format!("{asset_name}.sha256"),
                size: 0,
                url: format!("{base_url}.sha256"),
            },
        ],
    };
    log_release(&release);
    Ok(release)
}
