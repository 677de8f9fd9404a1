//! End-to-end coverage for `Installer::install()` against a stub server.

use granite_core::{Mirror, Settings};
use granite_installer::{InstallOutcome, Installer};
use sha1::{Digest, Sha1};

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Every expected artifact (main archive, asset index, the one asset
/// object, and the one library) is pre-populated on disk with a matching
/// hash before the install runs. Every per-artifact skip check in
/// `main_file_coordinator`, `asset_index_fetch`, and the asset/library
/// fan-outs should then take the "already present" branch: no
/// `RegularDownload` leaf is ever submitted, so the asset object and
/// library endpoints on the stub server see zero requests.
#[tokio::test]
async fn install_skip_when_every_artifact_already_matches() {
    let dir = tempfile::tempdir().unwrap();
    let working_path = dir.path().join("working");
    std::fs::create_dir_all(&working_path).unwrap();

    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let version = "1.20.4";
    let asset_index_id = "17";
    let object_name = "icons/icon.png";
    let library_path_in_tree = "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar";

    let jar_bytes = b"fake-client-jar-bytes";
    let jar_sha1 = sha1_hex(jar_bytes);

    let object_bytes = b"fake-icon-bytes";
    let object_sha1 = sha1_hex(object_bytes);

    let library_bytes = b"fake-lwjgl-jar-bytes";
    let library_sha1 = sha1_hex(library_bytes);

    let asset_index_body = format!(
        r#"{{"objects":{{"{object_name}":{{"hash":"{object_sha1}","size":{size}}}}}}}"#,
        size = object_bytes.len(),
    );
    let asset_index_sha1 = sha1_hex(asset_index_body.as_bytes());

    let metadata_body = format!(
        r#"{{"downloads":{{"client":{{"url":"{base}/client.jar","sha1":"{jar_sha1}","size":{jar_size}}}}},
        "assetIndex":{{"id":"{asset_index_id}","url":"{base}/assets/indexes/{asset_index_id}.json","sha1":"{asset_index_sha1}"}},
        "libraries":[{{"name":"org.lwjgl:lwjgl:3.3.1","downloads":{{"artifact":{{"path":"{library_path_in_tree}","url":"{base}/libraries/lwjgl.jar","sha1":"{library_sha1}"}},"classifiers":null}}}}]}}"#,
        jar_size = jar_bytes.len(),
    );

    let manifest_body =
        format!(r#"{{"versions":[{{"id":"{version}","url":"{base}/versions/{version}.json"}}]}}"#);

    let manifest_mock =
        server.mock("GET", "/manifest.json").with_status(200).with_body(&manifest_body).expect(1).create_async().await;
    let metadata_mock = server
        .mock("GET", format!("/versions/{version}.json").as_str())
        .with_status(200)
        .with_body(&metadata_body)
        .expect(1)
        .create_async()
        .await;
    let object_mock = server
        .mock("GET", format!("/{}/{}", &object_sha1[..2], object_sha1).as_str())
        .expect(0)
        .create_async()
        .await;
    let library_mock = server.mock("GET", "/libraries/lwjgl.jar").expect(0).create_async().await;

    let version_dir = working_path.join("versions").join(version);
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join(format!("{version}.jar")), jar_bytes).unwrap();

    let indexes_dir = working_path.join("assets").join("indexes");
    std::fs::create_dir_all(&indexes_dir).unwrap();
    std::fs::write(indexes_dir.join(format!("{asset_index_id}.json")), &asset_index_body).unwrap();

    let object_dir = working_path.join("assets").join("objects").join(&object_sha1[..2]);
    std::fs::create_dir_all(&object_dir).unwrap();
    std::fs::write(object_dir.join(&object_sha1), object_bytes).unwrap();

    let legacy_dir = working_path.join("assets").join("virtual").join("legacy").join("icons");
    std::fs::create_dir_all(&legacy_dir).unwrap();
    std::fs::write(legacy_dir.join("icon.png"), object_bytes).unwrap();

    let pre16_dir = working_path.join("assets").join("virtual").join("pre-1.6").join("icons");
    std::fs::create_dir_all(&pre16_dir).unwrap();
    std::fs::write(pre16_dir.join("icon.png"), object_bytes).unwrap();

    let library_dir = working_path.join("libraries").join("org").join("lwjgl").join("lwjgl").join("3.3.1");
    std::fs::create_dir_all(&library_dir).unwrap();
    std::fs::write(library_dir.join("lwjgl-3.3.1.jar"), library_bytes).unwrap();

    let settings = Settings {
        working_path: working_path.clone(),
        temp_path: dir.path().join("temp"),
        max_workers: 4,
        current_version: Some(version.to_string()),
    };
    let mirror = Mirror::custom(format!("{base}/manifest.json"), base.clone());

    let outcome = Installer::new(settings, mirror).install().await;

    match outcome {
        InstallOutcome::Success => {}
        other => panic!("expected install to succeed, got {other:?}"),
    }

    manifest_mock.assert_async().await;
    metadata_mock.assert_async().await;
    object_mock.assert_async().await;
    library_mock.assert_async().await;
}

/// A transport failure while fetching the version manifest aborts the
/// whole install: `summarize` reports the stage's `TaskResult::Err`
/// directly, surfaced as `InstallOutcome::Failed(AppError::Transport(_))`.
#[tokio::test(start_paused = true)]
async fn install_fails_when_manifest_is_unreachable() {
    use granite_core::AppError;

    let dir = tempfile::tempdir().unwrap();

    // Bind then immediately drop a listener to obtain a port nothing is
    // listening on, so connections to it are refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let unreachable_base = format!("http://127.0.0.1:{port}");

    let settings = Settings {
        working_path: dir.path().join("working"),
        temp_path: dir.path().join("temp"),
        max_workers: 4,
        current_version: Some("1.20.4".to_string()),
    };
    let mirror = Mirror::custom(format!("{unreachable_base}/manifest.json"), format!("{unreachable_base}/assets"));

    let outcome = Installer::new(settings, mirror).install().await;

    match outcome {
        InstallOutcome::Failed(AppError::Transport(_)) => {}
        other => panic!("expected a transport failure, got {other:?}"),
    }
}

#[test]
fn install_outcome_converts_to_process_exit_code() {
    use granite_core::AppError;

    let ok: i32 = InstallOutcome::Success.into();
    let failed: i32 = InstallOutcome::Failed(AppError::transport("boom")).into();
    assert_eq!(ok, 0);
    assert_eq!(failed, 1);
}
