//! Component catalog: built-in knowledge of where tools keep their
//! configuration, extended by `[components.<id>]` tables in the user config.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::Os;

/// Broad grouping used for display and filtering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Interactive shells.
    Shell,
    /// Text editors and IDEs.
    Editor,
    /// Terminal emulators and multiplexers.
    Terminal,
    /// Version control.
    Vcs,
    /// Language toolchains.
    Language,
    /// Package managers.
    PackageManager,
    /// Cloud and container tooling.
    Cloud,
    /// Desktop applications.
    Application,
    /// OS-level preferences.
    System,
    /// Anything else.
    #[default]
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shell => "shell",
            Self::Editor => "editor",
            Self::Terminal => "terminal",
            Self::Vcs => "vcs",
            Self::Language => "language",
            Self::PackageManager => "package-manager",
            Self::Cloud => "cloud",
            Self::Application => "application",
            Self::System => "system",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A component the engine knows how to detect and back up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSpec {
    /// Stable slug used as the backup subdirectory name.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category tag.
    pub category: Category,
    /// Candidate path patterns, in order. May contain `~`, `$VAR`,
    /// `${VAR:-default}` and glob metacharacters.
    pub paths: Vec<String>,
    /// Binary names looked up on the executable search path.
    pub executables: Vec<String>,
    /// Package names looked for in package-manager inventories.
    pub packages: Vec<String>,
    /// Platforms this component applies to; empty means all.
    pub platforms: Vec<Os>,
    /// Commands whose output is saved alongside the copied files.
    pub captures: Vec<CaptureSpec>,
}

impl ComponentSpec {
    /// Create a spec with the given id and display name and no hints.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            paths: Vec::new(),
            executables: Vec::new(),
            packages: Vec::new(),
            platforms: Vec::new(),
            captures: Vec::new(),
        }
    }

    /// Replace the candidate path patterns.
    #[must_use]
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the executable names.
    #[must_use]
    pub fn with_executables<I, S>(mut self, executables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executables = executables.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the package aliases.
    #[must_use]
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the component to the given platforms.
    #[must_use]
    pub fn on_platforms(mut self, platforms: &[Os]) -> Self {
        self.platforms = platforms.to_vec();
        self
    }

    /// Replace the saved command outputs.
    #[must_use]
    pub fn with_captures(mut self, captures: Vec<CaptureSpec>) -> Self {
        self.captures = captures;
        self
    }

    /// Whether a backup has anything to take without a resolved path.
    #[must_use]
    pub fn has_captures(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Names this component may appear under in a package inventory: its
    /// aliases, its id, and the canonical names of its executables.
    #[must_use]
    pub fn package_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .packages
            .iter()
            .map(|p| p.to_lowercase())
            .chain(std::iter::once(self.id.to_lowercase()))
            .chain(
                self.executables
                    .iter()
                    .map(|e| canonical_tool_name(e).to_lowercase()),
            )
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// A command whose standard output is saved with a component's backup,
/// such as a Brewfile dump or an editor's extension list.
///
/// The output lands in `<component>/@capture/<file>`. When `replay` is set,
/// `restore --replay` runs `program` again with those arguments, `{file}`
/// standing for the saved file, to bring the tool back to that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureSpec {
    /// Program to run. Skipped when it is not on the search path.
    pub program: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Plain file name the output is saved as.
    pub file: String,
    /// Arguments that feed the saved file back to `program`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replay: Vec<String>,
}

impl CaptureSpec {
    /// Save the output of `program args...` as `file`.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I, file: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            file: file.into(),
            replay: Vec::new(),
        }
    }

    /// Set the arguments used to feed the file back on restore.
    #[must_use]
    pub fn with_replay<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replay = args.into_iter().map(Into::into).collect();
        self
    }

    /// `program args...`, for logs and the manifest.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A path list that may be written as one string or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PathList {
    One(String),
    Many(Vec<String>),
}

impl Default for PathList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl From<PathList> for Vec<String> {
    fn from(list: PathList) -> Self {
        match list {
            PathList::One(p) => vec![p],
            PathList::Many(ps) => ps,
        }
    }
}

/// A `[components.<id>]` table from the user config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentEntry {
    name: Option<String>,
    category: Option<Category>,
    paths: PathList,
    executables: Vec<String>,
    packages: Vec<String>,
    platforms: Vec<Os>,
    captures: Vec<CaptureSpec>,
}

impl ComponentEntry {
    fn into_spec(self, id: &str) -> ComponentSpec {
        ComponentSpec {
            id: id.to_string(),
            name: self.name.unwrap_or_else(|| id.to_string()),
            category: self.category.unwrap_or_default(),
            paths: self.paths.into(),
            executables: self.executables,
            packages: self.packages,
            platforms: self.platforms,
            captures: self.captures,
        }
    }
}

/// The full set of known components, sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    components: Vec<ComponentSpec>,
}

impl Catalog {
    /// The built-in component table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN.iter().map(BuiltinEntry::to_spec).collect())
    }

    /// Build a catalog from explicit specs. Later duplicates of an id win.
    #[must_use]
    pub fn from_specs(specs: Vec<ComponentSpec>) -> Self {
        let by_id: BTreeMap<String, ComponentSpec> =
            specs.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            components: by_id.into_values().collect(),
        }
    }

    /// Merge user-defined entries: an existing id is replaced, a new id is
    /// added. User ids are slugified.
    #[must_use]
    pub fn merge(self, user: BTreeMap<String, ComponentEntry>) -> Self {
        let mut specs = self.components;
        specs.extend(
            user.into_iter()
                .map(|(id, entry)| entry.into_spec(&slugify(&id))),
        );
        Self::from_specs(specs)
    }

    /// All components in id order.
    #[must_use]
    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    /// Look up a component by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ComponentSpec> {
        self.components
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .and_then(|i| self.components.get(i))
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Normalize a display name into a component id.
///
/// Lowercases, turns every run of non-alphanumeric characters into a single
/// `-`, and trims leading and trailing dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Map a common executable alias to the tool's canonical name.
#[must_use]
pub fn canonical_tool_name(executable: &str) -> &str {
    match executable {
        "nvim" => "neovim",
        "code" => "vscode",
        "node" => "nodejs",
        "kubectl" => "kubernetes",
        "python3" => "python",
        "pip3" => "pip",
        "rg" => "ripgrep",
        "gh" => "github-cli",
        "aws" => "awscli",
        other => other,
    }
}

struct BuiltinEntry {
    id: &'static str,
    name: &'static str,
    category: Category,
    paths: &'static [&'static str],
    executables: &'static [&'static str],
    packages: &'static [&'static str],
    platforms: &'static [Os],
    captures: &'static [BuiltinCapture],
}

struct BuiltinCapture {
    program: &'static str,
    args: &'static [&'static str],
    file: &'static str,
    replay: &'static [&'static str],
}

impl BuiltinEntry {
    fn to_spec(&self) -> ComponentSpec {
        ComponentSpec::new(self.id, self.name, self.category)
            .with_paths(self.paths.iter().copied())
            .with_executables(self.executables.iter().copied())
            .with_packages(self.packages.iter().copied())
            .on_platforms(self.platforms)
            .with_captures(
                self.captures
                    .iter()
                    .map(|c| {
                        CaptureSpec::new(c.program, c.args.iter().copied(), c.file)
                            .with_replay(c.replay.iter().copied())
                    })
                    .collect(),
            )
    }
}

const ANY: &[Os] = &[];
const MACOS: &[Os] = &[Os::MacOs];

/// `defaults export <domain> -`, replayed with `defaults import`.
macro_rules! defaults_domain {
    ($domain:literal) => {
        BuiltinCapture {
            program: "defaults",
            args: &["export", $domain, "-"],
            file: concat!($domain, ".plist"),
            replay: &["import", $domain, "{file}"],
        }
    };
}

/// Preference domains saved by `macos-defaults`.
const DEFAULTS_DOMAINS: &[BuiltinCapture] = &[
    defaults_domain!("NSGlobalDomain"),
    defaults_domain!("com.apple.AppleMultitouchTrackpad"),
    defaults_domain!("com.apple.Terminal"),
    defaults_domain!("com.apple.dock"),
    defaults_domain!("com.apple.finder"),
    defaults_domain!("com.apple.screencapture"),
];

const BUILTIN: &[BuiltinEntry] = &[
    BuiltinEntry {
        id: "alacritty",
        name: "Alacritty",
        category: Category::Terminal,
        paths: &[
            "${XDG_CONFIG_HOME:-~/.config}/alacritty",
            "~/.alacritty.toml",
            "~/.alacritty.yml",
        ],
        executables: &["alacritty"],
        packages: &["alacritty"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "aws-cli",
        name: "AWS CLI",
        category: Category::Cloud,
        paths: &["~/.aws/config"],
        executables: &["aws"],
        packages: &["awscli"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "bash",
        name: "Bash",
        category: Category::Shell,
        paths: &["~/.bashrc", "~/.bash_profile", "~/.bash_aliases", "~/.inputrc"],
        executables: &["bash"],
        packages: &["bash"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "docker",
        name: "Docker",
        category: Category::Cloud,
        paths: &["~/.docker/daemon.json"],
        executables: &["docker"],
        packages: &["docker", "docker.io", "docker-ce"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "fish",
        name: "Fish",
        category: Category::Shell,
        paths: &["${XDG_CONFIG_HOME:-~/.config}/fish"],
        executables: &["fish"],
        packages: &["fish"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "git",
        name: "Git",
        category: Category::Vcs,
        paths: &[
            "~/.gitconfig",
            "~/.gitignore_global",
            "${XDG_CONFIG_HOME:-~/.config}/git",
        ],
        executables: &["git"],
        packages: &["git"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "homebrew",
        name: "Homebrew",
        category: Category::PackageManager,
        paths: &["~/.Brewfile", "${HOMEBREW_PREFIX:-/opt/homebrew}/etc/brew"],
        executables: &["brew"],
        packages: &[],
        platforms: MACOS,
        captures: &[BuiltinCapture {
            program: "brew",
            args: &["bundle", "dump", "--file=-"],
            file: "Brewfile",
            replay: &["bundle", "install", "--file={file}"],
        }],
    },
    BuiltinEntry {
        id: "iterm2",
        name: "iTerm2",
        category: Category::Terminal,
        paths: &["~/Library/Preferences/com.googlecode.iterm2.plist"],
        executables: &[],
        packages: &["iterm2"],
        platforms: MACOS,
        captures: &[],
    },
    BuiltinEntry {
        id: "jetbrains",
        name: "JetBrains IDEs",
        category: Category::Editor,
        paths: &[
            "~/Library/Application Support/JetBrains/*/options",
            "${XDG_CONFIG_HOME:-~/.config}/JetBrains/*/options",
        ],
        executables: &["idea", "pycharm", "goland", "clion", "rustrover"],
        packages: &["intellij-idea", "pycharm", "goland", "clion", "rustrover"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "karabiner",
        name: "Karabiner-Elements",
        category: Category::System,
        paths: &["${XDG_CONFIG_HOME:-~/.config}/karabiner/karabiner.json"],
        executables: &[],
        packages: &["karabiner-elements"],
        platforms: MACOS,
        captures: &[],
    },
    BuiltinEntry {
        id: "kitty",
        name: "kitty",
        category: Category::Terminal,
        paths: &["${XDG_CONFIG_HOME:-~/.config}/kitty"],
        executables: &["kitty"],
        packages: &["kitty"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "kubectl",
        name: "Kubernetes CLI",
        category: Category::Cloud,
        paths: &["~/.kube/config"],
        executables: &["kubectl"],
        packages: &["kubectl", "kubernetes-cli"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "launch-agents",
        name: "Launch Agents",
        category: Category::System,
        paths: &["~/Library/LaunchAgents/*.plist"],
        executables: &["launchctl"],
        packages: &[],
        platforms: MACOS,
        captures: &[],
    },
    BuiltinEntry {
        id: "macos-defaults",
        name: "macOS defaults",
        category: Category::System,
        paths: &[],
        executables: &["defaults"],
        packages: &[],
        platforms: MACOS,
        captures: DEFAULTS_DOMAINS,
    },
    BuiltinEntry {
        id: "mas",
        name: "Mac App Store",
        category: Category::PackageManager,
        paths: &[],
        executables: &["mas"],
        packages: &["mas"],
        platforms: MACOS,
        captures: &[BuiltinCapture {
            program: "mas",
            args: &["list"],
            file: "mas.list",
            replay: &[],
        }],
    },
    BuiltinEntry {
        id: "neovim",
        name: "Neovim",
        category: Category::Editor,
        paths: &["${XDG_CONFIG_HOME:-~/.config}/nvim"],
        executables: &["nvim"],
        packages: &["neovim"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "npm",
        name: "Node.js",
        category: Category::Language,
        paths: &["~/.npmrc", "~/.yarnrc", "~/.yarnrc.yml"],
        executables: &["node", "npm"],
        packages: &["node", "nodejs"],
        platforms: ANY,
        captures: &[BuiltinCapture {
            program: "npm",
            args: &["ls", "--global", "--depth=0"],
            file: "npm-globals.txt",
            replay: &[],
        }],
    },
    BuiltinEntry {
        id: "pipx",
        name: "pipx",
        category: Category::PackageManager,
        paths: &[],
        executables: &["pipx"],
        packages: &["pipx"],
        platforms: ANY,
        captures: &[BuiltinCapture {
            program: "pipx",
            args: &["list", "--short"],
            file: "pipx.txt",
            replay: &[],
        }],
    },
    BuiltinEntry {
        id: "python",
        name: "Python",
        category: Category::Language,
        paths: &[
            "~/.pypirc",
            "${XDG_CONFIG_HOME:-~/.config}/pip/pip.conf",
            "~/.pip/pip.conf",
        ],
        executables: &["python3", "pip3"],
        packages: &["python", "python3", "python-pip"],
        platforms: ANY,
        captures: &[BuiltinCapture {
            program: "pip3",
            args: &["freeze", "--user"],
            file: "requirements.txt",
            replay: &["install", "--user", "-r", "{file}"],
        }],
    },
    BuiltinEntry {
        id: "ssh",
        name: "SSH",
        category: Category::System,
        paths: &["~/.ssh/config", "~/.ssh/config.d"],
        executables: &["ssh"],
        packages: &["openssh", "openssh-client"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "starship",
        name: "Starship",
        category: Category::Shell,
        paths: &["${STARSHIP_CONFIG:-${XDG_CONFIG_HOME:-~/.config}/starship.toml}"],
        executables: &["starship"],
        packages: &["starship"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "tmux",
        name: "tmux",
        category: Category::Terminal,
        paths: &["~/.tmux.conf", "${XDG_CONFIG_HOME:-~/.config}/tmux"],
        executables: &["tmux"],
        packages: &["tmux"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "vim",
        name: "Vim",
        category: Category::Editor,
        paths: &["~/.vimrc", "~/.vim"],
        executables: &["vim"],
        packages: &["vim", "macvim"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "vscode",
        name: "Visual Studio Code",
        category: Category::Editor,
        paths: &[
            "~/Library/Application Support/Code/User/settings.json",
            "~/Library/Application Support/Code/User/keybindings.json",
            "~/Library/Application Support/Code/User/snippets",
            "${XDG_CONFIG_HOME:-~/.config}/Code/User/settings.json",
            "${XDG_CONFIG_HOME:-~/.config}/Code/User/keybindings.json",
            "${XDG_CONFIG_HOME:-~/.config}/Code/User/snippets",
        ],
        executables: &["code"],
        packages: &["visual-studio-code", "code"],
        platforms: ANY,
        captures: &[BuiltinCapture {
            program: "code",
            args: &["--list-extensions"],
            file: "extensions.txt",
            replay: &[],
        }],
    },
    BuiltinEntry {
        id: "wezterm",
        name: "WezTerm",
        category: Category::Terminal,
        paths: &["~/.wezterm.lua", "${XDG_CONFIG_HOME:-~/.config}/wezterm"],
        executables: &["wezterm"],
        packages: &["wezterm"],
        platforms: ANY,
        captures: &[],
    },
    BuiltinEntry {
        id: "zsh",
        name: "Zsh",
        category: Category::Shell,
        paths: &["~/.zshrc", "~/.zprofile", "~/.zshenv", "${ZDOTDIR:-~}/.zlogin"],
        executables: &["zsh"],
        packages: &["zsh"],
        platforms: ANY,
        captures: &[],
    },
];

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // slugify / canonical names
    // ------------------------------------------------------------------

    #[test]
    fn slugify_display_names() {
        assert_eq!(slugify("Visual Studio Code"), "visual-studio-code");
        assert_eq!(slugify("Node.js"), "node-js");
        assert_eq!(slugify("AWS CLI"), "aws-cli");
        assert_eq!(slugify("  --Git-- "), "git");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn canonical_tool_names() {
        assert_eq!(canonical_tool_name("nvim"), "neovim");
        assert_eq!(canonical_tool_name("code"), "vscode");
        assert_eq!(canonical_tool_name("node"), "nodejs");
        assert_eq!(canonical_tool_name("kubectl"), "kubernetes");
        assert_eq!(canonical_tool_name("git"), "git");
    }

    // ------------------------------------------------------------------
    // built-in table
    // ------------------------------------------------------------------

    #[test]
    fn builtin_is_sorted_and_unique() {
        let catalog = Catalog::builtin();
        let ids: Vec<&str> = catalog.components().iter().map(|c| c.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(catalog.len(), BUILTIN.len());
    }

    #[test]
    fn builtin_ids_are_slugs() {
        for c in Catalog::builtin().components() {
            assert_eq!(slugify(&c.id), c.id, "id {} is not a slug", c.id);
            assert!(
                !c.paths.is_empty() || c.has_captures(),
                "{} has nothing to back up",
                c.id
            );
        }
    }

    #[test]
    fn builtin_git_has_gitconfig() {
        let catalog = Catalog::builtin();
        let git = catalog.get("git").expect("git present");
        assert!(git.paths.iter().any(|p| p == "~/.gitconfig"));
        assert_eq!(git.category, Category::Vcs);
    }

    #[test]
    fn builtin_capture_files_are_plain_names() {
        for c in Catalog::builtin().components() {
            for capture in &c.captures {
                assert!(
                    !capture.file.is_empty() && !capture.file.contains(['/', '\\']),
                    "{}: {}",
                    c.id,
                    capture.file
                );
            }
        }
    }

    #[test]
    fn builtin_defaults_domains_replay_with_import() {
        let catalog = Catalog::builtin();
        let defaults = catalog.get("macos-defaults").expect("macos-defaults present");
        assert_eq!(defaults.platforms, vec![Os::MacOs]);
        let dock = defaults
            .captures
            .iter()
            .find(|c| c.file == "com.apple.dock.plist")
            .expect("dock domain");
        assert_eq!(dock.command_line(), "defaults export com.apple.dock -");
        assert_eq!(dock.replay, vec!["import", "com.apple.dock", "{file}"]);
    }

    #[test]
    fn builtin_homebrew_saves_brewfile() {
        let catalog = Catalog::builtin();
        let brew = catalog.get("homebrew").unwrap();
        assert_eq!(brew.captures.len(), 1);
        assert_eq!(brew.captures[0].file, "Brewfile");
        assert_eq!(brew.captures[0].command_line(), "brew bundle dump --file=-");
        assert!(catalog.get("launch-agents").unwrap().paths[0].ends_with("*.plist"));
    }

    #[test]
    fn package_names_include_id_and_canonical() {
        let catalog = Catalog::builtin();
        let nvim = catalog.get("neovim").unwrap();
        let names = nvim.package_names();
        assert!(names.contains(&"neovim".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "neovim").count(), 1);
    }

    // ------------------------------------------------------------------
    // user merge
    // ------------------------------------------------------------------

    fn parse_entries(toml_src: &str) -> BTreeMap<String, ComponentEntry> {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn merge_adds_new_component_with_single_path() {
        let user = parse_entries(
            r#"
[custom]
paths = "~/.custom"
"#,
        );
        let catalog = Catalog::builtin().merge(user);
        let custom = catalog.get("custom").expect("custom merged");
        assert_eq!(custom.paths, vec!["~/.custom"]);
        assert_eq!(custom.name, "custom");
        assert_eq!(custom.category, Category::Other);
    }

    #[test]
    fn merge_replaces_builtin() {
        let user = parse_entries(
            r#"
[git]
name = "Git (work)"
category = "vcs"
paths = ["~/work/.gitconfig"]
executables = ["git"]
"#,
        );
        let catalog = Catalog::builtin().merge(user);
        let git = catalog.get("git").unwrap();
        assert_eq!(git.name, "Git (work)");
        assert_eq!(git.paths, vec!["~/work/.gitconfig"]);
        assert_eq!(catalog.len(), BUILTIN.len());
    }

    #[test]
    fn merge_slugifies_user_ids() {
        let user = parse_entries(
            r#"
["My Tool"]
paths = ["~/.mytool"]
platforms = ["macos"]
"#,
        );
        let catalog = Catalog::from_specs(Vec::new()).merge(user);
        let tool = catalog.get("my-tool").expect("slugified id");
        assert_eq!(tool.platforms, vec![Os::MacOs]);
    }

    #[test]
    fn merge_reads_captures() {
        let user = parse_entries(
            r#"
[rustup]
executables = ["rustup"]
captures = [
    { program = "rustup", args = ["toolchain", "list"], file = "toolchains.txt" },
    { program = "cargo", args = ["install", "--list"], file = "cargo-installs.txt" },
]
"#,
        );
        let catalog = Catalog::from_specs(Vec::new()).merge(user);
        let rustup = catalog.get("rustup").unwrap();
        assert!(rustup.paths.is_empty());
        assert_eq!(rustup.captures.len(), 2);
        assert_eq!(rustup.captures[0].command_line(), "rustup toolchain list");
        assert!(rustup.captures[1].replay.is_empty());
    }

    #[test]
    fn unknown_capture_field_is_rejected() {
        let result: Result<BTreeMap<String, ComponentEntry>, _> = toml::from_str(
            "[x]\ncaptures = [{ program = \"x\", file = \"x.txt\", shell = true }]\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_entry_field_is_rejected() {
        let result: Result<BTreeMap<String, ComponentEntry>, _> =
            toml::from_str("[x]\npath = \"~/.x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn get_missing_returns_none() {
        assert!(Catalog::builtin().get("does-not-exist").is_none());
    }
}
