use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops;

/// A member name or an array position.
///
/// Serialized without a tag, so a path reads as `["todos", 0, "title"]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    Key(String),
    Index(usize),
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(name) => write!(f, ".{name}"),
            Seg::Index(pos) => write!(f, "[{pos}]"),
        }
    }
}

impl From<&str> for Seg {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<String> for Seg {
    fn from(name: String) -> Self {
        Seg::Key(name)
    }
}

impl From<usize> for Seg {
    fn from(pos: usize) -> Self {
        Seg::Index(pos)
    }
}

/// A location inside a state tree, from the root down.
///
/// The empty path addresses the root itself.
///
/// ```
/// use icebox::{path, Path};
///
/// let p = Path::root().key("todos").index(0).key("title");
/// assert_eq!(p, path!("todos", 0, "title"));
/// assert_eq!(p.to_string(), "$.todos[0].title");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn key(self, name: impl Into<String>) -> Self {
        self.then(Seg::Key(name.into()))
    }

    pub fn index(self, pos: usize) -> Self {
        self.then(Seg::Index(pos))
    }

    fn then(mut self, seg: Seg) -> Self {
        self.0.push(seg);
        self
    }

    pub fn push(&mut self, seg: impl Into<Seg>) {
        self.0.push(seg.into());
    }

    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// True for the root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `self` followed by `other`.
    pub fn join(&self, other: &Path) -> Path {
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// The ancestor `n` levels below the root.
    pub(crate) fn prefix(&self, n: usize) -> Path {
        Path(self.0[..n].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        self.iter().try_for_each(|seg| fmt::Display::fmt(seg, f))
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl From<Seg> for Path {
    fn from(seg: Seg) -> Self {
        Path(vec![seg])
    }
}

impl From<&str> for Path {
    fn from(name: &str) -> Self {
        Seg::from(name).into()
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, depth: usize) -> &Seg {
        &self.0[depth]
    }
}

/// Build a [`Path`]: string literals become keys, integers become indices.
///
/// ```
/// use icebox::path;
///
/// let p = path!("items", 2, "done");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}
