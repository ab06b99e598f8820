//! Implementation of `node-prebuild install` and `reinstall`.

use crate::builder::fallback::FallbackBuilder;
use crate::builder::toolchain::BuildSpec;
use crate::core::artifact_key::ArtifactClass;
use crate::core::errors::ProvisionError;
use crate::core::host::HostDescriptor;
use crate::ops::clean::clean;
use crate::ops::fetch::{copy_shared_libraries, InstallResult, Installer};
use crate::resolver::{match_artifact, ArtifactRequest};
use crate::sources::catalog::CatalogClient;
use crate::sources::http::Transport;
use crate::util::config::ResolvedInstallOptions;
use crate::util::context::ProjectContext;
use crate::util::fs::is_populated_dir;
use crate::util::process::CommandRunner;

/// What `install` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The SDK directory was already populated; nothing was touched.
    AlreadyInstalled,
    Installed {
        sdk: InstallResult,
        addon: InstallResult,
    },
}

/// Whether a previous install left a populated SDK directory.
pub fn sdk_installed(ctx: &ProjectContext) -> bool {
    is_populated_dir(&ctx.sdk_dir())
}

/// Provision the SDK and the addon for `host`.
///
/// Does nothing when the SDK directory is already populated. Otherwise the
/// catalog is fetched once, the SDK is installed, and the addon is either
/// downloaded or, when permitted, built locally.
pub fn install(
    ctx: &ProjectContext,
    host: &HostDescriptor,
    opts: &ResolvedInstallOptions,
    transport: &dyn Transport,
    runner: &dyn CommandRunner,
) -> Result<InstallOutcome, ProvisionError> {
    let sdk_dir = ctx.sdk_dir();
    if sdk_installed(ctx) {
        tracing::info!("SDK already installed in {}", sdk_dir.display());
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    let manifest = ctx.manifest()?;
    let binary_dir = ctx.binary_dir();
    tracing::debug!("resolving artifacts for {}", host);

    let catalog = CatalogClient::new(transport, opts.catalog_url.clone()).fetch()?;
    let installer = Installer::new(transport, &ctx.staging_dir());

    let sdk_request = ArtifactRequest::new(
        ArtifactClass::Sdk,
        opts.sdk_name.as_str(),
        host.clone(),
        manifest.version.as_str(),
    );
    let sdk_entry = match_artifact(&catalog, &sdk_request, &opts.catalog_keys)
        .ok_or_else(|| sdk_request.no_match())?;
    let sdk = installer.install_sdk(sdk_entry, host, &sdk_dir, &binary_dir)?;

    let addon_request = ArtifactRequest::new(
        ArtifactClass::Addon,
        opts.addon_name.as_str(),
        host.clone(),
        manifest.version.as_str(),
    );
    let downloaded = match match_artifact(&catalog, &addon_request, &opts.catalog_keys) {
        Some(entry) => installer.install(entry, &binary_dir),
        None => Err(addon_request.no_match()),
    };

    let addon = match downloaded {
        Ok(result) => result,
        Err(err) if err.is_recoverable_by_fallback() => {
            let Some(toolchain) = opts.fallback else {
                return Err(err);
            };
            tracing::warn!("{}; building from source with {}", err, toolchain);
            let built = FallbackBuilder::new(runner, ctx.root())
                .build_and_install(&BuildSpec::for_host(toolchain, host), &binary_dir)?;
            // the toolchain clean may have wiped the SDK libraries
            copy_shared_libraries(&sdk_dir, &binary_dir)?;
            built
        }
        Err(err) => return Err(err),
    };

    Ok(InstallOutcome::Installed { sdk, addon })
}

/// Remove previous installs, then install unconditionally.
pub fn reinstall(
    ctx: &ProjectContext,
    host: &HostDescriptor,
    opts: &ResolvedInstallOptions,
    transport: &dyn Transport,
    runner: &dyn CommandRunner,
) -> Result<InstallOutcome, ProvisionError> {
    clean(ctx)?;
    install(ctx, host, opts, transport, runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::ToolchainKind;
    use crate::core::host::{Arch, Platform, RuntimeFamily};
    use crate::core::manifest::PrebuildConfig;
    use crate::ops::fetch::SourceKind;
    use crate::test_support::{
        catalog_json, tar_gz_bytes, write_manifest, MockHttpResponse, MockRunner, MockTransport,
    };
    use crate::util::config::InstallFlags;
    use semver::Version;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG_URL: &str = "https://catalog.test/api/list";
    const SDK_FILE: &str = "mylib-v1.2.3-linux-x64.tar.gz";
    const ADDON_FILE: &str = "mylib-v1.2.3-abi108-linux-x64.tar.gz";

    fn linux_node18() -> HostDescriptor {
        HostDescriptor::new(
            Platform::Linux,
            Arch::X64,
            RuntimeFamily::Node,
            Version::new(18, 0, 0),
        )
    }

    fn project() -> (TempDir, ProjectContext) {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "mylib", "1.2.3", None);
        let ctx = ProjectContext::from_dir(tmp.path()).unwrap();
        (tmp, ctx)
    }

    fn options(fallback: Option<Option<String>>) -> ResolvedInstallOptions {
        let flags = InstallFlags {
            catalog_url: Some(CATALOG_URL.into()),
            fall_back_to_build: fallback,
            ..Default::default()
        };
        ResolvedInstallOptions::resolve(&flags, &PrebuildConfig::default(), "mylib").unwrap()
    }

    fn transport(addon: &[(&str, &str)]) -> MockTransport {
        let transport = MockTransport::new();
        let sdk_url = format!("https://cdn/{}", SDK_FILE);
        transport.mock_url(
            CATALOG_URL,
            MockHttpResponse::ok(catalog_json("1.2.3", &[(SDK_FILE, sdk_url.as_str())], addon)),
        );
        transport.mock_url(
            &sdk_url,
            MockHttpResponse::ok(tar_gz_bytes(&[
                ("mylib/lib/libmylib_core.so", b"core"),
                ("mylib/include/mylib.h", b"header"),
            ])),
        );
        transport
    }

    #[test]
    fn test_install_downloads_sdk_and_addon() {
        let (tmp, ctx) = project();
        let addon_url = format!("https://cdn/{}", ADDON_FILE);
        let transport = transport(&[(ADDON_FILE, addon_url.as_str())]);
        transport.mock_url(
            &addon_url,
            MockHttpResponse::ok(tar_gz_bytes(&[("mylib/mylib.node", b"addon")])),
        );
        let runner = MockRunner::new();

        let outcome = install(&ctx, &linux_node18(), &options(None), &transport, &runner).unwrap();

        let InstallOutcome::Installed { sdk, addon } = outcome else {
            panic!("expected a fresh install");
        };
        let binary_dir = tmp.path().join("build/Release");
        assert_eq!(sdk.local_paths, vec![binary_dir.join("libmylib_core.so")]);
        assert_eq!(addon.source_kind, SourceKind::Downloaded);
        assert_eq!(addon.local_paths, vec![binary_dir.join("mylib.node")]);
        assert!(tmp.path().join("sdk/include/mylib.h").exists());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_second_install_makes_no_requests() {
        let (tmp, ctx) = project();
        let sdk_dir = tmp.path().join("sdk");
        fs::create_dir_all(&sdk_dir).unwrap();
        fs::write(sdk_dir.join("marker.txt"), b"installed").unwrap();

        let transport = MockTransport::new();
        let outcome = install(
            &ctx,
            &linux_node18(),
            &options(None),
            &transport,
            &MockRunner::new(),
        )
        .unwrap();

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert!(transport.requests().is_empty());
        assert_eq!(fs::read(sdk_dir.join("marker.txt")).unwrap(), b"installed");
    }

    #[test]
    fn test_missing_addon_without_fallback() {
        let (_tmp, ctx) = project();
        let transport = transport(&[]);

        let err = install(
            &ctx,
            &linux_node18(),
            &options(None),
            &transport,
            &MockRunner::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), "NoMatchingArtifact");
    }

    #[test]
    fn test_missing_addon_with_fallback_builds() {
        let (tmp, ctx) = project();
        let wrong_abi = "mylib-v1.2.3-abi115-linux-x64.tar.gz";
        let transport = transport(&[(wrong_abi, "https://cdn/wrong")]);
        let runner = MockRunner::new().with_outputs(&["mylib.node"]);

        let outcome = install(
            &ctx,
            &linux_node18(),
            &options(Some(Some("cmake-js".into()))),
            &transport,
            &runner,
        )
        .unwrap();

        let InstallOutcome::Installed { addon, .. } = outcome else {
            panic!("expected a fresh install");
        };
        assert_eq!(addon.source_kind, SourceKind::Built);
        assert!(tmp.path().join("build/Release/mylib.node").exists());
        assert!(tmp.path().join("build/Release/libmylib_core.so").exists());

        let commands = runner.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], "npx cmake-js clean");
        assert!(commands[1].starts_with("npx cmake-js configure"));
        assert!(!transport
            .requests()
            .contains(&"https://cdn/wrong".to_string()));
    }

    #[test]
    fn test_failed_download_falls_back() {
        let (_tmp, ctx) = project();
        let addon_url = format!("https://cdn/{}", ADDON_FILE);
        let transport = transport(&[(ADDON_FILE, addon_url.as_str())]);
        transport.mock_url(&addon_url, MockHttpResponse::server_error("unavailable"));
        let runner = MockRunner::new().with_outputs(&["mylib.node"]);

        let outcome = install(
            &ctx,
            &linux_node18(),
            &options(Some(None)),
            &transport,
            &runner,
        )
        .unwrap();

        assert!(matches!(outcome, InstallOutcome::Installed { .. }));
        assert!(runner.commands()[1].starts_with("npx node-gyp configure"));
    }

    #[test]
    fn test_empty_addon_archive_falls_back() {
        let (tmp, ctx) = project();
        let addon_url = format!("https://cdn/{}", ADDON_FILE);
        let transport = transport(&[(ADDON_FILE, addon_url.as_str())]);
        transport.mock_url(
            &addon_url,
            MockHttpResponse::ok(tar_gz_bytes(&[("mylib.node", b"flat")])),
        );
        let runner = MockRunner::new().with_outputs(&["mylib.node"]);

        let outcome = install(
            &ctx,
            &linux_node18(),
            &options(Some(None)),
            &transport,
            &runner,
        )
        .unwrap();

        let InstallOutcome::Installed { addon, .. } = outcome else {
            panic!("expected a fresh install");
        };
        assert_eq!(addon.source_kind, SourceKind::Built);
        assert!(tmp.path().join("build/Release/mylib.node").exists());
    }

    #[test]
    fn test_empty_addon_archive_without_fallback() {
        let (_tmp, ctx) = project();
        let addon_url = format!("https://cdn/{}", ADDON_FILE);
        let transport = transport(&[(ADDON_FILE, addon_url.as_str())]);
        transport.mock_url(
            &addon_url,
            MockHttpResponse::ok(tar_gz_bytes(&[("mylib.node", b"flat")])),
        );

        let err = install(
            &ctx,
            &linux_node18(),
            &options(None),
            &transport,
            &MockRunner::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), "ExtractionError");
    }

    #[test]
    fn test_fallback_build_failure_is_fatal() {
        let (_tmp, ctx) = project();
        let transport = transport(&[]);
        let runner = MockRunner::new().fail_on("configure");

        let err = install(
            &ctx,
            &linux_node18(),
            &options(Some(Some("node-gyp".into()))),
            &transport,
            &runner,
        )
        .unwrap_err();

        assert_eq!(err.kind(), "BuildToolchainError");
    }

    #[test]
    fn test_catalog_failure_aborts() {
        let (tmp, ctx) = project();
        let transport = MockTransport::new();
        transport.mock_url(CATALOG_URL, MockHttpResponse::server_error("down"));

        let err = install(
            &ctx,
            &linux_node18(),
            &options(Some(None)),
            &transport,
            &MockRunner::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), "CatalogFetchError");
        assert!(!tmp.path().join("sdk").exists());
    }

    #[test]
    fn test_missing_sdk_is_fatal_even_with_fallback() {
        let (_tmp, ctx) = project();
        let transport = MockTransport::new();
        transport.mock_url(
            CATALOG_URL,
            MockHttpResponse::ok(catalog_json("1.2.3", &[], &[])),
        );

        let err = install(
            &ctx,
            &linux_node18(),
            &options(Some(None)),
            &transport,
            &MockRunner::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "NoMatchingArtifact");
    }

    #[test]
    fn test_reinstall_replaces_sdk() {
        let (tmp, ctx) = project();
        let sdk_dir = tmp.path().join("sdk");
        fs::create_dir_all(&sdk_dir).unwrap();
        fs::write(sdk_dir.join("stale.txt"), b"old").unwrap();

        let addon_url = format!("https://cdn/{}", ADDON_FILE);
        let transport = transport(&[(ADDON_FILE, addon_url.as_str())]);
        transport.mock_url(
            &addon_url,
            MockHttpResponse::ok(tar_gz_bytes(&[("mylib/mylib.node", b"addon")])),
        );

        let outcome = reinstall(
            &ctx,
            &linux_node18(),
            &options(None),
            &transport,
            &MockRunner::new(),
        )
        .unwrap();

        assert!(matches!(outcome, InstallOutcome::Installed { .. }));
        assert!(!sdk_dir.join("stale.txt").exists());
        assert!(sdk_dir.join("include/mylib.h").exists());
    }

    #[test]
    fn test_default_toolchain_is_node_gyp() {
        assert_eq!(options(Some(None)).fallback, Some(ToolchainKind::NodeGyp));
    }
}
