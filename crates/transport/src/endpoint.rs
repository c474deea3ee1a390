//! Remote endpoint parsing.
//!
//! Archive tools address a remote tape as `[user@]host:file`. The parse is a
//! single left-to-right pass with two split points: the first `@` — provided
//! it appears before any `:` — separates the user, and the first `:`
//! separates the file. Later occurrences of either separator are literal
//! content, so `host:/dev/rmt@1` and `host:a:b` parse the way the historical
//! clients parsed them. Newlines are rejected outright: the protocol is
//! newline-delimited and has no way to quote them.

use std::io;

use thiserror::Error;

/// Why an endpoint string failed to parse.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EndpointError {
    /// The name contains a newline, which the wire protocol cannot carry.
    #[error("remote file name contains a newline")]
    EmbeddedNewline,
    /// The name has no `:`, so it does not name a remote file at all.
    #[error("remote file name has no `host:` prefix")]
    MissingFile,
    /// The host portion before the `:` is empty.
    #[error("remote file name has an empty host")]
    EmptyHost,
}

impl From<EndpointError> for io::Error {
    /// Endpoint errors surface with "no such file or directory" semantics,
    /// matching what callers expect from a failed open of a bad file name.
    fn from(err: EndpointError) -> Self {
        io::Error::new(io::ErrorKind::NotFound, err)
    }
}

/// A parsed `[user@]host:file` endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RemoteEndpoint {
    user: Option<String>,
    host: String,
    file: String,
}

impl RemoteEndpoint {
    /// Parses an endpoint string.
    ///
    /// An empty user portion (`@host:file`) is normalised to absent. The
    /// file portion may be empty — the remote `open` will reject it — but
    /// the host may not.
    ///
    /// # Examples
    ///
    /// ```
    /// use rmt_transport::RemoteEndpoint;
    ///
    /// let ep = RemoteEndpoint::parse("operator@vault:/dev/nst0").unwrap();
    /// assert_eq!(ep.user(), Some("operator"));
    /// assert_eq!(ep.host(), "vault");
    /// assert_eq!(ep.file(), "/dev/nst0");
    /// ```
    ///
    /// # Errors
    ///
    /// See [`EndpointError`].
    pub fn parse(name: &str) -> Result<Self, EndpointError> {
        let mut at_split = None;
        let mut colon_split = None;

        for (index, byte) in name.bytes().enumerate() {
            match byte {
                b'\n' => return Err(EndpointError::EmbeddedNewline),
                b'@' if at_split.is_none() && colon_split.is_none() => {
                    at_split = Some(index);
                }
                b':' if colon_split.is_none() => colon_split = Some(index),
                _ => {}
            }
        }

        let colon = colon_split.ok_or(EndpointError::MissingFile)?;
        let (user, host_start) = match at_split {
            Some(at) => {
                let user = &name[..at];
                let user = (!user.is_empty()).then(|| user.to_owned());
                (user, at + 1)
            }
            None => (None, 0),
        };

        let host = &name[host_start..colon];
        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }

        Ok(Self {
            user,
            host: host.to_owned(),
            file: name[colon + 1..].to_owned(),
        })
    }

    /// The remote user, when one was given and non-empty.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The remote host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote file (usually a tape device path).
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }
}

/// Whether a file name uses the `host:file` remote syntax.
///
/// Callers honouring a force-local configuration must consult that knob
/// before this predicate; a forced-local name is never parsed as remote no
/// matter how many colons it contains.
#[must_use]
pub fn is_remote_path(name: &str) -> bool {
    name.contains(':')
}
