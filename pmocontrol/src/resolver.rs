//! Résolution locale des liens soumis
//!
//! Un lien est réduit à un couple (service, identifiant) sans aucun accès
//! réseau. Services reconnus : YouTube, SoundCloud, Spotify.

use url::Url;

use crate::errors::{JukeboxError, Result};

pub const YOUTUBE: &str = "youtube";
pub const SOUNDCLOUD: &str = "soundcloud";
pub const SPOTIFY: &str = "spotify";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub service: &'static str,
    pub service_id: String,
}

impl ResolvedLink {
    /// Titre par défaut d'une soumission sans titre
    pub fn label(&self) -> String {
        format!("{}:{}", self.service, self.service_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver;

impl LinkResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, link: &str) -> Result<ResolvedLink> {
        let link = link.trim();
        let url = parse_link(link).ok_or_else(|| JukeboxError::unresolved_link(link))?;

        let host = url.host_str().unwrap_or_default();
        let host = host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host);
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let resolved = match host {
            "youtube.com" | "music.youtube.com" => youtube_watch_id(&url).map(|id| (YOUTUBE, id)),
            "youtu.be" => segments
                .first()
                .filter(|id| is_youtube_id(id))
                .map(|id| (YOUTUBE, id.to_string())),
            "soundcloud.com" => match segments.as_slice() {
                [artist, track, ..] => Some((SOUNDCLOUD, format!("{}/{}", artist, track))),
                _ => None,
            },
            "open.spotify.com" => segments
                .iter()
                .position(|seg| *seg == "track")
                .and_then(|i| segments.get(i + 1))
                .map(|id| (SPOTIFY, id.to_string())),
            _ => None,
        };

        resolved
            .map(|(service, service_id)| ResolvedLink {
                service,
                service_id,
            })
            .ok_or_else(|| JukeboxError::unresolved_link(link))
    }
}

fn parse_link(link: &str) -> Option<Url> {
    if link.is_empty() {
        return None;
    }
    Url::parse(link)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{}", link)).ok())
}

fn youtube_watch_id(url: &Url) -> Option<String> {
    if url.path() != "/watch" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| is_youtube_id(id))
}

fn is_youtube_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(link: &str) -> Option<(&'static str, String)> {
        LinkResolver::new()
            .resolve(link)
            .ok()
            .map(|r| (r.service, r.service_id))
    }

    #[test]
    fn test_youtube_links() {
        let expected = Some((YOUTUBE, "dQw4w9WgXcQ".to_string()));
        assert_eq!(resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(resolve("https://youtube.com/watch?list=x&v=dQw4w9WgXcQ"), expected);
        assert_eq!(resolve("youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(resolve("https://music.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(resolve("https://www.youtube.com/channel/abc"), None);
    }

    #[test]
    fn test_soundcloud_links() {
        assert_eq!(
            resolve("https://soundcloud.com/artist/some-track"),
            Some((SOUNDCLOUD, "artist/some-track".to_string()))
        );
        assert_eq!(resolve("https://soundcloud.com/artist"), None);
    }

    #[test]
    fn test_spotify_links() {
        assert_eq!(
            resolve("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=1"),
            Some((SPOTIFY, "4uLU6hMCjMI75M1A2tKUQC".to_string()))
        );
        assert_eq!(resolve("https://open.spotify.com/album/xyz"), None);
    }

    #[test]
    fn test_unknown_links_are_rejected() {
        let err = LinkResolver::new().resolve("https://example.com/song").unwrap_err();
        assert!(matches!(err, JukeboxError::UnresolvedLink(_)));
        assert!(LinkResolver::new().resolve("").is_err());
        assert!(LinkResolver::new().resolve("   ").is_err());
    }

    #[test]
    fn test_label() {
        let link = LinkResolver::new().resolve("youtu.be/abc").unwrap();
        assert_eq!(link.label(), "youtube:abc");
    }
}
