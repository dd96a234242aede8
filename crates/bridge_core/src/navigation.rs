//! Navigation history, breadcrumbs and sidebar places

use serde::{Deserialize, Serialize};

/// Visited directories with a cursor. `""` is home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    paths: Vec<String>,
    current: usize,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self {
            paths: vec![String::new()],
            current: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.paths[self.current]
    }

    /// Record a navigation to `path`. Returns false if it is already current.
    pub fn visit(&mut self, path: &str) -> bool {
        if self.current() == path {
            return false;
        }
        // Clear forward stack
        self.paths.truncate(self.current + 1);
        self.paths.push(path.to_string());
        self.current = self.paths.len() - 1;
        true
    }

    /// Go back in history
    pub fn back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        self.current -= 1;
        Some(self.current())
    }

    /// Go forward in history
    pub fn forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        self.current += 1;
        Some(self.current())
    }

    /// Parent of the current directory; does not touch history
    pub fn up(&self) -> String {
        parent_path(self.current())
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.current + 1 < self.paths.len()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        // Home is always present
        false
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Everything before the last separator; `""` for top-level entries
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(idx) => trimmed[..idx].to_string(),
        None => String::new(),
    }
}

/// One step of the breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub label: String,
    /// Path to list when the crumb is clicked
    pub path: String,
    pub active: bool,
}

/// Home followed by one crumb per segment of `path`
pub fn breadcrumbs(path: &str) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        label: "Home".to_string(),
        path: String::new(),
        active: false,
    }];

    let mut cumulative = String::new();
    for segment in path.split(is_separator).filter(|s| !s.is_empty()) {
        if !cumulative.is_empty() {
            cumulative.push('/');
        }
        cumulative.push_str(segment);
        crumbs.push(Crumb {
            label: segment.to_string(),
            path: cumulative.clone(),
            active: false,
        });
    }

    if let Some(last) = crumbs.last_mut() {
        last.active = true;
    }
    crumbs
}

/// Fixed entries of the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SidebarPlace {
    Home,
    Desktop,
    Documents,
    Downloads,
    Pictures,
    Music,
    Videos,
}

impl SidebarPlace {
    pub const ALL: [SidebarPlace; 7] = [
        SidebarPlace::Home,
        SidebarPlace::Desktop,
        SidebarPlace::Documents,
        SidebarPlace::Downloads,
        SidebarPlace::Pictures,
        SidebarPlace::Music,
        SidebarPlace::Videos,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SidebarPlace::Home => "Home",
            SidebarPlace::Desktop => "Desktop",
            SidebarPlace::Documents => "Documents",
            SidebarPlace::Downloads => "Downloads",
            SidebarPlace::Pictures => "Pictures",
            SidebarPlace::Music => "Music",
            SidebarPlace::Videos => "Videos",
        }
    }

    /// Path listed when the place is selected
    pub fn path(&self) -> &'static str {
        match self {
            SidebarPlace::Home => "",
            other => other.label(),
        }
    }

    /// Place to highlight while `path` is shown
    pub fn for_path(path: &str) -> SidebarPlace {
        let lower = path.to_lowercase();
        Self::ALL
            .into_iter()
            .skip(1)
            .find(|place| {
                let name = place.label().to_lowercase();
                lower == name
                    || lower
                        .strip_prefix(&name)
                        .is_some_and(|rest| rest.starts_with(is_separator))
            })
            .unwrap_or(SidebarPlace::Home)
    }
}
