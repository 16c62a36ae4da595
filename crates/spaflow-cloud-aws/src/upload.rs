//! Upload of the built assets to the bucket

use crate::context::Context;
use spaflow_cloud::asset::{cache_control, content_type};
use spaflow_cloud::{CloudError, DomainSpec, Result};
use std::path::{Path, PathBuf};

/// File to upload, with its path relative to the deployed folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub path: PathBuf,
    /// `/`-separated, whatever the platform
    pub relative: String,
}

/// Every file under `folder`, sorted by relative path.
pub fn collect_assets(folder: &Path) -> Result<Vec<LocalAsset>> {
    let pattern = folder.join("**").join("*");
    let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
        CloudError::InvalidConfig(format!("invalid folder {}: {e}", folder.display()))
    })?;

    let mut assets = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CloudError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(folder) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        assets.push(LocalAsset { path, relative });
    }

    assets.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(assets)
}

pub struct AssetUploader<'a> {
    ctx: &'a Context,
}

impl<'a> AssetUploader<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Upload `folder` to the target's bucket, under its subfolder if any.
    /// Returns the number of uploaded objects.
    pub async fn upload(
        &self,
        folder: &Path,
        target: &DomainSpec,
        cache_busted_prefix: Option<&str>,
    ) -> Result<usize> {
        let bucket = target.bucket();
        tracing::info!(
            "[S3] ✏️ uploading \"{}\" folder on \"{}\"...",
            folder.display(),
            bucket
        );

        let assets = collect_assets(folder)?;
        for asset in &assets {
            let key = target.object_key(&asset.relative);
            let mime = content_type(&asset.relative);
            tracing::debug!("[S3] put {} ({})", key, mime);

            self.ctx
                .storage
                .put_object(
                    bucket,
                    &key,
                    &asset.path,
                    mime.to_string(),
                    cache_control(&asset.relative, cache_busted_prefix).map(str::to_string),
                )
                .await?;
        }

        tracing::info!("[S3] 👍 {} files uploaded", assets.len());
        Ok(assets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::Mocks;
    use std::fs;
    use std::sync::{Arc, Mutex};

    fn build_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static/js")).unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("static/js/main.abc123.js"), "console.log(1)").unwrap();
        fs::write(dir.path().join("favicon.ico"), [0u8, 1, 2]).unwrap();
        dir
    }

    #[test]
    fn test_collect_assets_sorted_relative_paths() {
        let dir = build_folder();
        let relative: Vec<String> = collect_assets(dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.relative)
            .collect();
        assert_eq!(
            relative,
            vec!["favicon.ico", "index.html", "static/js/main.abc123.js"]
        );
    }

    #[tokio::test]
    async fn test_upload_sets_keys_types_and_cache_control() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        let uploads = Arc::new(Mutex::new(Vec::new()));
        let sink = uploads.clone();
        mocks.storage.expect_put_object().returning(
            move |bucket, key, path, content_type, cache_control| {
                sink.lock().unwrap().push((
                    bucket.to_string(),
                    key.to_string(),
                    fs::metadata(path).unwrap().len() as usize,
                    content_type,
                    cache_control,
                ));
                Ok(())
            },
        );
        let ctx = mocks.into_context();

        let target = DomainSpec::parse("hello.example.com/feature-1").unwrap();
        let count = AssetUploader::new(&ctx)
            .upload(dir.path(), &target, Some("static/"))
            .await
            .unwrap();
        assert_eq!(count, 3);

        let uploads = uploads.lock().unwrap();
        assert!(uploads.iter().all(|u| u.0 == "hello.example.com"));
        assert_eq!(uploads[1].1, "feature-1/index.html");
        assert_eq!(uploads[1].2, "<html></html>".len());
        assert_eq!(uploads[1].3, "text/html");
        assert_eq!(
            uploads[1].4.as_deref(),
            Some("public, must-revalidate, proxy-revalidate, max-age=0")
        );
        assert_eq!(uploads[2].1, "feature-1/static/js/main.abc123.js");
        assert_eq!(uploads[2].4.as_deref(), Some("max-age=31536000"));
        assert_eq!(uploads[0].4, None);
    }
}
