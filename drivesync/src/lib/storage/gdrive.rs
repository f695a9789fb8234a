use std::sync::Arc;

use async_stream::try_stream;
use chrono::{DateTime, Utc};
use dsync::{Entry, Precision};
use futures::Stream;
use tokio::io;

use crate::{oauth2::GetToken, storage::id::IdBuf, PersistCache};

pub struct GoogleDrive<A> {
    client: reqwest::Client,
    auth: Arc<A>,
    base_url: &'static str,
    upload_base_url: &'static str,
    user_agent: String,

    root: IdBuf,
    user: api::User,
    quota: api::Quota,
}

impl<A> Clone for GoogleDrive<A> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            auth: self.auth.clone(),
            base_url: self.base_url,
            upload_base_url: self.upload_base_url,
            user_agent: self.user_agent.clone(),
            root: self.root.clone(),
            user: self.user.clone(),
            quota: self.quota.clone(),
        }
    }
}

impl<A> GoogleDrive<A>
where
    A: GetToken,
{
    /// Connects to the drive of the authorized user.
    /// `root` is an optional slash separated folder path that
    /// replaces "My Drive" as the root of the synchronization.
    pub async fn new(auth: A, client: reqwest::Client, root: Option<&str>) -> dsync::Result<Self> {
        let user_agent = format!("drivesync/{}", env!("CARGO_PKG_VERSION"));
        let mut drive = Self {
            auth: Arc::new(auth),
            client,
            base_url: "https://www.googleapis.com/drive/v3",
            upload_base_url: "https://www.googleapis.com/upload/drive/v3",
            user_agent,
            root: IdBuf::from("root"),
            user: api::User::default(),
            quota: api::Quota::default(),
        };

        let about = drive.about_get().await?;
        drive.user = about.user;
        drive.quota = about.storage_quota;

        if let Some(root) = root {
            drive.root = drive
                .path_to_id(root)
                .await?
                .ok_or_else(|| dsync::Error::NotFound(format!("No such Drive folder: '{root}'")))?;
        }

        log::info!(
            "Access granted to Drive of {}{}",
            drive.user.display_name,
            drive
                .user
                .email_address
                .as_ref()
                .map(|em| format!(" <{em}>"))
                .unwrap_or_default(),
        );
        if let (Some(usage), Some(limit)) = (drive.quota.usage, drive.quota.limit) {
            use byte_unit::{Byte, UnitType};
            if let (Some(usage), Some(limit)) = (Byte::from_i64(usage), Byte::from_i64(limit)) {
                let usage = usage.get_appropriate_unit(UnitType::Binary);
                let limit = limit.get_appropriate_unit(UnitType::Binary);
                log::info!("Usage {usage:#.2} / {limit:#.3}");
            }
        }

        Ok(drive)
    }

    /// The folder the synchronization starts from
    pub fn root_entry(&self) -> Entry<IdBuf> {
        Entry::directory("", self.root.clone(), None)
    }

    async fn path_to_id(&self, path: &str) -> dsync::Result<Option<IdBuf>> {
        let mut cur_id = IdBuf::from("root");
        for name in path.split('/').filter(|c| !c.is_empty()) {
            let folder = self.find_child(&cur_id, name).await?;
            match folder {
                Some(f) if f.mime_type.as_deref() == Some(FOLDER_MIMETYPE) => match f.id {
                    Some(id) => cur_id = id,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        }
        Ok(Some(cur_id))
    }

    /// Looks up the non-trashed child `name` of the folder `parent_id`.
    async fn find_child(&self, parent_id: &IdBuf, name: &str) -> dsync::Result<Option<api::File>> {
        let q = format!(
            "name = {} and '{parent_id}' in parents and trashed = false",
            utils::quote(name)
        );
        let files = self.files_list(q, None).await?.files.unwrap_or_default();
        if files.len() > 1 {
            dsync::invalid_bail!("'{name}' is ambiguous: {} entries share this name", files.len());
        }
        Ok(files.into_iter().next())
    }
}

impl<A> super::DirEntries for GoogleDrive<A>
where
    A: GetToken,
{
    type Handle = IdBuf;

    fn dir_entries(&self, dir: &Entry<IdBuf>) -> impl Stream<Item = dsync::Result<Entry<IdBuf>>> + Send {
        let parent_id = dir.handle().clone();
        log::trace!("listing entries of folder {parent_id}");
        let q = format!("'{parent_id}' in parents and trashed = false");
        let mut next_page_token = None;

        try_stream! {
            loop {
                let file_list = self.files_list(q.clone(), next_page_token).await?;
                next_page_token = file_list.next_page_token;
                if let Some(files) = file_list.files {
                    for f in files {
                        match map_file(f) {
                            Ok(entry) => yield entry,
                            Err(err) => log::warn!("skipping an entry of folder {parent_id}: {err}"),
                        }
                    }
                }
                if next_page_token.is_none() {
                    break;
                }
            }
        }
    }
}

impl<A> super::ModifiedTime for GoogleDrive<A>
where
    A: GetToken,
{
    fn mtime_precision(&self) -> Precision {
        Precision::Millisecond
    }

    async fn modified_time(&self, entry: &Entry<IdBuf>) -> dsync::Result<DateTime<Utc>> {
        if let Some(mtime) = entry.mtime() {
            return Ok(mtime);
        }
        let file = self
            .files_get(entry.handle().as_str())
            .await?
            .ok_or_else(|| dsync::Error::NotFound(entry.name().to_string()))?;
        file.modified_time
            .ok_or_else(|| dsync::api_error!("No modifiedTime returned for {}", entry.name()))
    }
}

impl<A> super::ReadFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn read_file(&self, entry: &Entry<IdBuf>) -> dsync::Result<impl io::AsyncRead + Send> {
        if !entry.is_file() {
            return Err(dsync::Error::NotDownloadable(entry.name().to_string()));
        }
        log::trace!("reading file {}", entry.handle());
        self.files_get_media(entry.handle().as_str())
            .await?
            .ok_or_else(|| dsync::Error::NotFound(entry.name().to_string()))
    }
}

impl<A> super::WriteFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn write_file(
        &self,
        dir: &Entry<IdBuf>,
        name: &str,
        mtime: DateTime<Utc>,
        size: u64,
        data: impl io::AsyncRead + Send,
    ) -> dsync::Result<Entry<IdBuf>> {
        let existing = self.find_child(dir.handle(), name).await?;
        let file = match existing {
            Some(f) if f.mime_type.as_deref() == Some(FOLDER_MIMETYPE) => {
                dsync::invalid_bail!("{name} is a folder on Drive");
            }
            Some(f) => {
                let id = f
                    .id
                    .ok_or_else(|| dsync::api_error!("No ID returned for {name}"))?;
                log::info!("updating file {name} ({size} bytes)");
                let meta = api::File {
                    modified_time: Some(mtime),
                    ..Default::default()
                };
                self.files_update_upload(&id, &meta, size, data).await?
            }
            None => {
                log::info!("creating file {name} ({size} bytes)");
                let meta = api::File {
                    name: Some(name.to_string()),
                    modified_time: Some(mtime),
                    parents: Some(vec![dir.handle().clone()]),
                    ..Default::default()
                };
                self.files_create_upload(&meta, size, data).await?
            }
        };
        map_file(file)
    }
}

impl<A> super::MkDir for GoogleDrive<A>
where
    A: GetToken,
{
    async fn make_directory(&self, dir: &Entry<IdBuf>, name: &str) -> dsync::Result<Entry<IdBuf>> {
        if let Some(existing) = self.find_child(dir.handle(), name).await? {
            if existing.mime_type.as_deref() != Some(FOLDER_MIMETYPE) {
                dsync::invalid_bail!("{name} exists on Drive and is not a folder");
            }
            return map_file(existing);
        }
        log::info!("creating folder {name} in folder {}", dir.handle());
        let f = api::File {
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIMETYPE.to_string()),
            parents: Some(vec![dir.handle().clone()]),
            ..Default::default()
        };
        let f = self.files_create(&f).await?;
        map_file(f)
    }
}

impl<A> super::Exists for GoogleDrive<A>
where
    A: GetToken,
{
    async fn exists(&self, entry: &Entry<IdBuf>) -> dsync::Result<bool> {
        if entry.handle().is_staged() {
            return Ok(false);
        }
        let file = self.files_get(entry.handle().as_str()).await?;
        Ok(matches!(file, Some(f) if f.trashed != Some(true)))
    }
}

impl<A> super::Delete for GoogleDrive<A>
where
    A: GetToken,
{
    async fn delete(&self, entry: &Entry<IdBuf>) -> dsync::Result<()> {
        if entry.is_dir() {
            let q = format!("'{}' in parents and trashed = false", entry.handle());
            let children = self.files_list(q, None).await?;
            if children.files.is_some_and(|f| !f.is_empty()) {
                dsync::io_bail!("{} is a non-empty folder", entry.name());
            }
        }
        log::info!("deleting {} ({})", entry.name(), entry.handle());
        self.files_delete(entry.handle().as_str()).await
    }
}

impl<A> PersistCache for GoogleDrive<A>
where
    A: PersistCache + Send + Sync,
{
    async fn persist_cache(&self) -> anyhow::Result<()> {
        self.auth.persist_cache().await
    }
}

impl<A> super::Storage for GoogleDrive<A> where A: GetToken + PersistCache {}

const FOLDER_MIMETYPE: &str = "application/vnd.google-apps.folder";
const SHORTCUT_MIMETYPE: &str = "application/vnd.google-apps.shortcut";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

fn map_file(f: api::File) -> dsync::Result<Entry<IdBuf>> {
    let id = f.id.unwrap_or_default();
    let name = f
        .name
        .ok_or_else(|| dsync::api_error!("Expected to receive name from Google for {id}"))?;
    let mime_type = f.mime_type.as_deref().unwrap_or_default();

    let entry = if mime_type == FOLDER_MIMETYPE {
        Entry::directory(name, id, f.modified_time)
    } else if mime_type == SHORTCUT_MIMETYPE {
        Entry::symlink(name, id, f.modified_time)
    } else if mime_type.starts_with(GOOGLE_APPS_PREFIX) {
        // Docs, Sheets, Forms...: no binary content to download
        Entry::special(name, id, f.modified_time)
    } else if let Some(mtime) = f.modified_time {
        let size = f.size.unwrap_or(0).max(0) as u64;
        Entry::regular(name, id, mtime, size)
    } else {
        log::warn!("no modifiedTime received from Google for {name}, it won't be synchronized");
        Entry::special(name, id, None)
    };
    Ok(entry)
}

mod api {
    use chrono::{DateTime, Utc};
    use http::StatusCode;
    use serde::{Deserialize, Serialize};
    use tokio::io;

    use super::utils::{check_response, num_from_str, num_to_str};
    use crate::{error, oauth2::GetToken, storage::id::IdBuf};

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub display_name: String,
        pub email_address: Option<String>,
    }

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Quota {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub limit: Option<i64>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub usage: Option<i64>,
    }

    const ABOUT_FIELDS: &str = "kind,storageQuota,user";

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct About {
        kind: String,
        pub storage_quota: Quota,
        pub user: User,
    }

    const FILE_FIELDS: &str = "id,name,size,modifiedTime,mimeType,trashed";

    #[derive(Default, Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct File {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub id: Option<IdBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub modified_time: Option<DateTime<Utc>>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "num_to_str",
            deserialize_with = "num_from_str"
        )]
        pub size: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub parents: Option<Vec<IdBuf>>,
        #[serde(skip_serializing)]
        pub trashed: Option<bool>,
    }

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileList {
        pub files: Option<Vec<File>>,
        pub next_page_token: Option<String>,
    }

    #[derive(Debug, Clone, Copy)]
    pub enum Scope {
        Full,
        MetadataReadOnly,
    }

    impl AsRef<str> for Scope {
        fn as_ref(&self) -> &str {
            match self {
                Scope::Full => "https://www.googleapis.com/auth/drive",
                Scope::MetadataReadOnly => "https://www.googleapis.com/auth/drive.metadata.readonly",
            }
        }
    }

    impl From<Scope> for oauth2::Scope {
        fn from(value: Scope) -> Self {
            oauth2::Scope::new(value.as_ref().to_string())
        }
    }

    #[derive(Debug, Clone)]
    pub struct UploadParams<'a> {
        pub size: u64,
        pub mime_type: Option<&'a str>,
    }

    impl<'a> UploadParams<'a> {
        pub fn query_params(&self) -> [(&'static str, &'static str); 2] {
            [("uploadType", "resumable"), ("fields", FILE_FIELDS)]
        }
    }

    const UPLOAD_CHUNK_SZ: u64 = 2 * 256 * 1024;

    impl<A> super::GoogleDrive<A>
    where
        A: GetToken,
    {
        pub async fn about_get(&self) -> dsync::Result<About> {
            let path = "/about";
            let query_params = [("fields", ABOUT_FIELDS)];

            let res = self
                .get_query(&[Scope::MetadataReadOnly], path, query_params)
                .await?;
            let res = check_response("GET", path, res).await?;
            let about: About = res.json().await.map_err(error::api)?;
            if about.kind != "drive#about" {
                dsync::api_bail!("/about returned wrong kind: {}", about.kind);
            }
            Ok(about)
        }

        pub async fn files_list(&self, q: String, page_token: Option<String>) -> dsync::Result<FileList> {
            let path = "/files";

            let mut query_params = vec![
                ("q", q),
                ("fields", format!("nextPageToken,files({FILE_FIELDS})")),
                ("alt", "json".into()),
            ];
            if let Some(page_token) = page_token {
                query_params.push(("pageToken", page_token));
            }

            let res = self
                .get_query(&[Scope::MetadataReadOnly], path, query_params)
                .await?;
            let res = check_response("GET", path, res).await?;

            res.json().await.map_err(error::api)
        }

        /// Metadata of `file_id`, or `None` if Drive doesn't know it
        pub async fn files_get(&self, file_id: &str) -> dsync::Result<Option<File>> {
            let path = format!("/files/{file_id}");
            let query_params = [("fields", FILE_FIELDS)];

            let res = self
                .get_query(&[Scope::MetadataReadOnly], &path, query_params)
                .await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let res = check_response("GET", &path, res).await?;
            Ok(Some(res.json().await.map_err(error::api)?))
        }

        pub async fn files_get_media(
            &self,
            file_id: &str,
        ) -> dsync::Result<Option<impl io::AsyncRead + Send>> {
            use futures::stream::{StreamExt, TryStreamExt};

            let path = format!("/files/{file_id}");
            let query_params = [("alt", "media")];

            let res = self.get_query(&[Scope::Full], &path, query_params).await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let res = check_response("GET", &path, res).await?;

            let bytes = res.bytes_stream().map(|res| res.map_err(error::io_other));
            let read = bytes.into_async_read();

            Ok(Some(tokio_util::compat::FuturesAsyncReadCompatExt::compat(
                read,
            )))
        }

        pub async fn files_create(&self, file: &File) -> dsync::Result<File> {
            let path = "/files";
            let query_params = [("fields", FILE_FIELDS)];
            let res = self
                .post_json_query(&[Scope::Full], path, query_params, file)
                .await?;
            let res = check_response("POST", path, res).await?;

            res.json().await.map_err(error::api)
        }

        pub async fn files_delete(&self, file_id: &str) -> dsync::Result<()> {
            let path = format!("/files/{file_id}");
            let res = self.delete_query(&[Scope::Full], &path).await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(());
            }
            check_response("DELETE", &path, res).await?;
            Ok(())
        }

        pub async fn files_create_upload<D>(&self, file: &File, data_len: u64, data: D) -> dsync::Result<File>
        where
            D: io::AsyncRead + Send,
        {
            let params = UploadParams {
                size: data_len,
                mime_type: file.mime_type.as_deref(),
            };
            let upload_url = self
                .start_upload(&[Scope::Full], http::Method::POST, "/files", &params, file)
                .await?;
            self.upload_chunks(upload_url, data_len, data).await
        }

        pub async fn files_update_upload<D>(
            &self,
            file_id: &IdBuf,
            file: &File,
            data_len: u64,
            data: D,
        ) -> dsync::Result<File>
        where
            D: io::AsyncRead + Send,
        {
            let params = UploadParams {
                size: data_len,
                mime_type: file.mime_type.as_deref(),
            };
            let path = format!("/files/{file_id}");
            let upload_url = self
                .start_upload(&[Scope::Full], http::Method::PATCH, &path, &params, file)
                .await?;
            self.upload_chunks(upload_url, data_len, data).await
        }

        async fn upload_chunks<D>(&self, upload_url: reqwest::Url, data_len: u64, data: D) -> dsync::Result<File>
        where
            D: io::AsyncRead + Send,
        {
            use io::AsyncReadExt;

            tokio::pin!(data);

            let mut sent = 0u64;
            let file: File = loop {
                let mut buf: Vec<u8> = Vec::with_capacity(UPLOAD_CHUNK_SZ as _);
                let sz = data
                    .as_mut()
                    .take(UPLOAD_CHUNK_SZ)
                    .read_to_end(&mut buf)
                    .await?;
                log::trace!("uploading {sz} bytes at offset {sent}");
                let res = self
                    .put_upload_range(&[Scope::Full], upload_url.clone(), buf, sent, data_len)
                    .await?;
                sent += sz as u64;
                let status = res.status();
                if status.is_success() && sent >= data_len {
                    break res.json().await.map_err(error::api)?;
                } else if status.is_server_error() {
                    dsync::api_bail!("Upload failed ({status}), resuming is not supported");
                } else if status.is_client_error() {
                    let body = res.text().await.unwrap_or_default();
                    dsync::api_bail!("Upload rejected ({status}): {body}");
                } else if sz == 0 {
                    return Err(dsync::transfer_error!(
                        "Data ended after {sent} of {data_len} bytes"
                    ));
                }
            };
            Ok(file)
        }
    }
}

mod utils {
    use std::borrow::Borrow;

    use oauth2::AccessToken;
    use reqwest::{header, Response, StatusCode, Url};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::api;
    use crate::{error, oauth2::GetToken};

    pub fn num_to_str<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn num_from_str<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use std::str::FromStr;

        let s = String::deserialize(deserializer)?;
        Ok(Some(i64::from_str(&s).map_err(serde::de::Error::custom)?))
    }

    /// Quotes `s` as a string literal of the Drive query language
    pub fn quote(s: &str) -> String {
        let mut res = String::with_capacity(s.len() + 2);
        res.push('\'');
        for c in s.chars() {
            if c == '\\' || c == '\'' {
                res.push('\\');
            }
            res.push(c);
        }
        res.push('\'');
        res
    }

    pub async fn check_response(method: &str, path: &str, res: Response) -> dsync::Result<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            dsync::auth_bail!("{method} {path} returned {status}\n{body}");
        }
        dsync::api_bail!("{method} {path} returned {status}\n{body}");
    }

    impl<A> super::GoogleDrive<A>
    where
        A: GetToken,
    {
        pub async fn fetch_token(&self, scopes: &[api::Scope]) -> dsync::Result<AccessToken> {
            let scopes = scopes.iter().map(|&s| s.into()).collect();
            self.auth.get_token(scopes).await
        }

        pub async fn get_query<Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
        ) -> dsync::Result<Response>
        where
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;

            self.client
                .get(url)
                .header(header::USER_AGENT, &self.user_agent)
                .bearer_auth(token.secret())
                .send()
                .await
                .map_err(error::transfer)
        }

        pub async fn delete_query(&self, scopes: &[api::Scope], path: &str) -> dsync::Result<Response> {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, None::<(&str, &str)>)?;

            self.client
                .delete(url)
                .header(header::USER_AGENT, &self.user_agent)
                .bearer_auth(token.secret())
                .send()
                .await
                .map_err(error::transfer)
        }

        pub async fn post_json_query<T, Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
            body: &T,
        ) -> dsync::Result<Response>
        where
            T: Serialize,
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;
            self.client
                .post(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .json(body)
                .send()
                .await
                .map_err(error::transfer)
        }

        /// Opens a resumable upload session and returns its URL
        pub async fn start_upload<B>(
            &self,
            scopes: &[api::Scope],
            method: http::Method,
            path: &str,
            params: &api::UploadParams<'_>,
            body: &B,
        ) -> dsync::Result<Url>
        where
            B: Serialize,
        {
            let token = self.fetch_token(scopes).await?;

            let url = url_with_query(self.upload_base_url, path, params.query_params())?;
            let mut req = self
                .client
                .request(method.clone(), url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header("X-Upload-Content-Length", params.size);
            if let Some(mt) = params.mime_type {
                req = req.header("X-Upload-Content-Type", mt);
            }
            let res = req
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .json(body)
                .send()
                .await
                .map_err(error::transfer)?;

            let res = check_response(method.as_str(), path, res).await?;
            let location = res
                .headers()
                .get(header::LOCATION)
                .and_then(|loc| loc.to_str().ok())
                .ok_or_else(|| dsync::api_error!("{method} {path} returned no upload location"))?;
            Url::parse(location).map_err(error::api)
        }

        pub async fn put_upload_range(
            &self,
            scopes: &[api::Scope],
            url: Url,
            data: Vec<u8>,
            range_start: u64,
            range_len: u64,
        ) -> dsync::Result<Response> {
            let token = self.fetch_token(scopes).await?;

            let data_len = data.len() as u64;

            let mut req = self
                .client
                .put(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_LENGTH, data_len);
            if data_len > 0 && (range_start > 0 || data_len < range_len) {
                req = req.header(
                    header::CONTENT_RANGE,
                    format!(
                        "bytes {range_start}-{}/{range_len}",
                        range_start + data_len - 1
                    ),
                );
            }
            req.body(data).send().await.map_err(error::transfer)
        }
    }

    pub fn url_with_query<B, P, Q, K, V>(base_url: B, path: P, query_params: Q) -> dsync::Result<Url>
    where
        B: AsRef<str>,
        P: AsRef<str>,
        Q: IntoIterator,
        Q::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let base = format!("{}{}", base_url.as_ref(), path.as_ref());
        Url::parse_with_params(&base, query_params).map_err(error::api)
    }

}
