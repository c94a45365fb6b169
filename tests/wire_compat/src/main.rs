fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use taskdeck_protocol::{
        CompletedPart, CreateFileRequest, CreateFileResponse, UploadProgress, UploadStatus,
        complete_multipart_body,
    };
    use taskdeck_transfer::UploadPlan;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// The service writes `40` where Rust's `f64` serializes as `40.0`.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    #[test]
    fn fixture_create_file_request() {
        let req: CreateFileRequest = roundtrip_test("create_file_request.json");
        assert_eq!(req.size, 25 * 1024 * 1024);
    }

    #[test]
    fn fixture_simple_response() {
        let resp: CreateFileResponse = roundtrip_test("create_file_response_simple.json");
        assert!(!resp.upload_info.is_multipart());

        let info = resp.upload_info;
        let plan = UploadPlan::simple(info.url.unwrap(), info.headers).unwrap();
        match plan {
            UploadPlan::Simple { headers, .. } => {
                assert_eq!(headers["Content-Type"], "text/markdown");
                assert_eq!(headers.len(), 2);
            }
            other => panic!("expected simple plan, got {other:?}"),
        }
    }

    #[test]
    fn fixture_multipart_response_covers_file() {
        let resp: CreateFileResponse = roundtrip_test("create_file_response_multipart.json");
        assert!(resp.upload_info.is_multipart());

        let urls = resp.upload_info.urls.unwrap();
        let size = 25 * 1024 * 1024;
        let plan = UploadPlan::multipart(urls.parts, urls.finalize, size).unwrap();
        assert_eq!(plan.part_count(), 5);
        assert_eq!(plan.part_lengths(size), vec![5 * 1024 * 1024; 5]);
        match plan {
            UploadPlan::Multipart { finalize_url, .. } => {
                assert!(finalize_url.ends_with("uploadId=u-77"));
            }
            other => panic!("expected multipart plan, got {other:?}"),
        }
    }

    #[test]
    fn fixture_multipart_response_rejected_for_larger_file() {
        let resp: CreateFileResponse = roundtrip_test("create_file_response_multipart.json");
        let urls = resp.upload_info.urls.unwrap();
        assert!(UploadPlan::multipart(urls.parts, urls.finalize, 30 * 1024 * 1024).is_err());
    }

    #[test]
    fn fixture_upload_progress() {
        let progress: UploadProgress = roundtrip_test("upload_progress.json");
        assert_eq!(progress.status, UploadStatus::InProgress);
        assert_eq!(progress.byte_percentage(), 40.0);
    }

    #[test]
    fn fixture_complete_multipart_upload() {
        let expected = read_fixture("complete_multipart_upload.xml");
        let etags = [
            "\"9b2cf535f27731c974343645a3985328\"",
            "\"7d4a0b1e8f3c2d5a6b9e0f1a2b3c4d5e\"",
            "\"e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6\"",
        ];
        // Bookkeeping order must not matter.
        let parts: Vec<CompletedPart> = [2usize, 0, 1]
            .iter()
            .map(|&i| CompletedPart {
                part_number: i as u32 + 1,
                etag: etags[i].to_string(),
            })
            .collect();

        assert_eq!(complete_multipart_body(&parts), expected.trim_end());
    }
}
