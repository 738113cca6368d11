//! End-to-end tests driving the `msgvault-install` binary.

use std::path::Path;
use std::process::{Command, Output};

use mvi_schema::{Platform, Sha256Digest};

const ENV_VARS: &[&str] = &[
    "MSGVAULT_INSTALL_DIR",
    "MSGVAULT_SKIP_CHECKSUM",
    "MSGVAULT_NO_MODIFY_PATH",
    "MSGVAULT_VERSION",
    "MSGVAULT_API_BASE",
    "MSGVAULT_DOWNLOAD_BASE",
];

fn installer() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_msgvault-install"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to spawn msgvault-install")
}

#[test]
fn help_lists_install_flags() {
    let out = run(installer().arg("--help"));
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    for flag in ["--install-dir", "--skip-checksum", "--no-modify-path", "--release"] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
    assert!(!stdout.contains("--api-base"));
}

#[test]
fn version_is_reported() {
    let out = run(installer().arg("--version"));
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("msgvault-install "));
}

#[test]
fn hash_prints_manifest_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("abc.txt");
    std::fs::write(&file, b"abc").unwrap();

    let out = run(installer().arg("hash").arg(&file));
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim_end(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  abc.txt"
    );
}

#[test]
fn hash_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(installer().arg("hash").arg(dir.path().join("nope")));
    assert!(!out.status.success());
}

#[test]
fn unreachable_release_index_exits_with_network_code() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(installer()
        .args(["--api-base", "http://127.0.0.1:9", "--no-modify-path", "--quiet"])
        .arg("--install-dir")
        .arg(dir.path().join("bin")));

    assert_eq!(out.status.code(), Some(3));
    assert!(!dir.path().join("bin").exists());
}

#[test]
fn dry_run_downloads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(installer()
        .args(["--release", "v1.2.0", "--dry-run", "--download-base", "http://127.0.0.1:9"])
        .arg("--install-dir")
        .arg(dir.path().join("bin")));

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("http://127.0.0.1:9/v1.2.0/msgvault_1.2.0_"));
    assert!(!dir.path().join("bin").exists());
}

fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

struct Release {
    server: mockito::ServerGuard,
    _mocks: Vec<mockito::Mock>,
    archive_name: String,
}

/// Serve a v1.2.0 release for this machine, optionally with a bad checksum.
fn serve_release(tamper: bool) -> Release {
    let platform = Platform::detect().unwrap();
    let tag = mvi_schema::ReleaseTag::new("v1.2.0").unwrap();
    let archive_name = mvi_schema::archive_name(&tag, &platform);
    let archive = tar_gz(&[
        ("msgvault_1.2.0/LICENSE", "MIT"),
        ("msgvault_1.2.0/msgvault", "#!/bin/sh\necho msgvault 1.2.0\n"),
    ]);

    let digest = if tamper {
        Sha256Digest::compute(b"something else")
    } else {
        Sha256Digest::compute(&archive)
    };
    let manifest = format!(
        "{}  msgvault_1.2.0_windows_arm64.zip\n{digest}  *{archive_name}\n",
        "f".repeat(64)
    );

    let mut server = mockito::Server::new();
    let mocks = vec![
        server
            .mock("GET", "/repos/wesm/msgvault/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name": "v1.2.0"}"#)
            .create(),
        server
            .mock("GET", "/download/v1.2.0/checksums.txt")
            .with_status(200)
            .with_body(manifest)
            .create(),
        server
            .mock("GET", format!("/download/v1.2.0/{archive_name}").as_str())
            .with_status(200)
            .with_body(archive)
            .create(),
    ];

    Release {
        server,
        _mocks: mocks,
        archive_name,
    }
}

fn install_from(release: &Release, install_dir: &Path) -> Output {
    let url = release.server.url();
    run(installer()
        .args(["--api-base", &url])
        .args(["--download-base", &format!("{url}/download")])
        .arg("--no-modify-path")
        .arg("--install-dir")
        .arg(install_dir))
}

// Release archives for Windows are zip; the fixture builds tar.gz.
#[cfg(unix)]
#[test]
fn installs_latest_release() {
    let release = serve_release(false);
    let dir = tempfile::tempdir().unwrap();
    let install_dir = dir.path().join("bin");

    let out = install_from(&release, &install_dir);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let installed = install_dir.join("msgvault");
    assert_eq!(
        std::fs::read_to_string(&installed).unwrap(),
        "#!/bin/sh\necho msgvault 1.2.0\n"
    );

    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
    assert!(release.archive_name.ends_with(".tar.gz"));
}

#[cfg(unix)]
#[test]
fn tampered_archive_is_rejected() {
    let release = serve_release(true);
    let dir = tempfile::tempdir().unwrap();
    let install_dir = dir.path().join("bin");

    let out = install_from(&release, &install_dir);
    assert_eq!(out.status.code(), Some(4));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("expected"), "stderr: {stderr}");
    assert!(!install_dir.exists());
}
