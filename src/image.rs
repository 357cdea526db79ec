// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

/// A docker image reference, as named by a resolved `FROM` line or an
/// external `COPY --from` source.
///
/// The `Display` impl may be used to convert a parsed image back to a plain
/// string:
/// ```
/// use dockerfile_plan::ImageRef;
///
/// let image = ImageRef::parse("quay.io/org/app:1.2");
/// assert_eq!(image.registry, Some("quay.io".to_string()));
/// assert_eq!(image.repository, "org/app");
/// assert_eq!(image.tag, Some("1.2".to_string()));
/// assert_eq!(image.to_string(), "quay.io/org/app:1.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
  /// An explicit registry host, if any; Docker Hub otherwise
  pub registry: Option<String>,

  /// The repository path, possibly including an organization
  pub repository: String,

  /// A tag following the repository, e.g. `3.18`
  pub tag: Option<String>,

  /// A content digest such as `sha256:...`; may accompany a tag
  pub digest: Option<String>
}

/// The first path component names a registry only if it can't be confused
/// with a Docker Hub organization.
fn is_registry(component: &str) -> bool {
  component == "localhost" || component.contains('.') || component.contains(':')
}

impl ImageRef {
  /// Parses an image reference. This never fails; malformed references are
  /// split as well as possible and are left to the image builder to reject.
  pub fn parse(s: &str) -> ImageRef {
    let (rest, digest) = match s.find('@') {
      Some(pos) => (&s[..pos], Some(s[pos + 1..].to_string())),
      None => (s, None)
    };

    let (registry, path) = match rest.find('/') {
      Some(pos) if is_registry(&rest[..pos]) => {
        (Some(rest[..pos].to_string()), &rest[pos + 1..])
      },
      _ => (None, rest)
    };

    // a colon after the last slash separates the tag
    let name_start = path.rfind('/').map(|p| p + 1).unwrap_or(0);
    let (repository, tag) = match path[name_start..].find(':') {
      Some(pos) => {
        let split = name_start + pos;
        (&path[..split], Some(path[split + 1..].to_string()))
      },
      None => (path, None)
    };

    ImageRef {
      registry,
      repository: repository.to_string(),
      tag,
      digest
    }
  }

  /// True for the reserved empty image.
  pub fn is_scratch(&self) -> bool {
    self.registry.is_none()
      && self.tag.is_none()
      && self.digest.is_none()
      && self.repository.eq_ignore_ascii_case("scratch")
  }
}

impl fmt::Display for ImageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(registry) = &self.registry {
      write!(f, "{}/", registry)?;
    }

    f.write_str(&self.repository)?;

    if let Some(tag) = &self.tag {
      write!(f, ":{}", tag)?;
    }

    if let Some(digest) = &self.digest {
      write!(f, "@{}", digest)?;
    }

    Ok(())
  }
}
