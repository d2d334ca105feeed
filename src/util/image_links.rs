use serde::Deserialize;
use url::Url;

/// How image links pasted into the sheets are written to the artifact.
///
/// Editors paste Google Drive share links for logos and backgrounds; those
/// links point at a viewer page, not the image. `DriveDirect` rewrites them
/// to the direct-view form. The transform is string-to-string and never
/// touches the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageLinks {
    /// Leave every link as-is.
    #[default]
    Passthrough,
    /// Rewrite Drive share links to `https://drive.google.com/uc?export=view&id=<ID>`.
    DriveDirect,
}

impl ImageLinks {
    pub fn apply(self, link: &str) -> String {
        match self {
            ImageLinks::Passthrough => link.to_string(),
            ImageLinks::DriveDirect => match drive_file_id(link) {
                Some(id) => format!("https://drive.google.com/uc?export=view&id={id}"),
                None => link.to_string(),
            },
        }
    }
}

fn is_drive_host(host: &str) -> bool {
    host == "drive.google.com" || host == "docs.google.com" || host.ends_with(".googleusercontent.com")
}

fn is_file_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// File ID from `/file/d/<ID>/…`, `/d/<ID>` or `?id=<ID>` Drive links.
fn drive_file_id(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    if !url.host_str().is_some_and(is_drive_host) {
        return None;
    }

    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "d" {
            return segments
                .next()
                .filter(|id| is_file_id(id))
                .map(str::to_string);
        }
    }

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, id)| id.into_owned())
        .filter(|id| is_file_id(id))
}
