//! Install prompt composition
//!
//! Offers the user a single informational entry linking to the extension's
//! release page while the capability is missing. Trust decisions are never
//! made here; visibility follows [`ExtensionInstaller::should_prompt_installation`].

use crate::config::Config;
use crate::installer::ExtensionInstaller;
use serde::Serialize;

/// An inert informational entry with an external link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEntry {
    pub title: String,
    pub summary: String,
    /// URI opened when the user selects the entry
    pub link: String,
    pub icon_space_reserved: bool,
}

/// A UI container that accepts appended entries
pub trait PromptContainer {
    fn add_entry(&mut self, entry: PromptEntry);
}

impl PromptContainer for Vec<PromptEntry> {
    fn add_entry(&mut self, entry: PromptEntry) {
        self.push(entry);
    }
}

/// Text and link of the install prompt
#[derive(Debug, Clone)]
pub struct InstallPrompt {
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl InstallPrompt {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.extension.prompt_title.clone(),
            summary: config.extension.prompt_summary.clone(),
            link: config.extension.distribution_url.clone(),
        }
    }

    fn to_entry(&self) -> PromptEntry {
        PromptEntry {
            title: self.title.clone(),
            summary: self.summary.clone(),
            link: self.link.clone(),
            icon_space_reserved: false,
        }
    }
}

/// Append the install prompt to `container` if the user should be offered the extension
///
/// Returns whether an entry was added.
pub fn add_install_prompt_if_needed(
    installer: &ExtensionInstaller,
    prompt: &InstallPrompt,
    container: &mut dyn PromptContainer,
) -> bool {
    if !installer.should_prompt_installation() {
        return false;
    }

    container.add_entry(prompt.to_entry());
    true
}
