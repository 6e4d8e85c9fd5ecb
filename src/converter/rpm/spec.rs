//! RPM spec file generation.

use crate::converter::{error::Result, metadata::ApplicationMetadata};
use handlebars::Handlebars;
use serde::Serialize;

const SPEC_TEMPLATE: &str = r#"%global debug_package %{nil}
%global __os_install_post %{nil}
%global _build_id_links none

Name:           {{name}}
Version:        {{version}}
Release:        {{release}}%{?dist}
Summary:        {{summary}}
License:        {{license}}
{{#if url}}
URL:            {{url}}
{{/if}}
Source0:        %{name}.tar.gz
BuildArch:      {{build_arch}}
AutoReqProv:    no
{{#each requires}}
Requires:       {{this}}
{{/each}}

%description
{{description}}

%prep
%setup -q -c

%build

%install
mkdir -p %{buildroot}
cp -a %{name}/. %{buildroot}/

{{#if has_icons}}
%post
/bin/touch --no-create %{_datadir}/icons/hicolor &>/dev/null || :

%postun
if [ $1 -eq 0 ] ; then
    /bin/touch --no-create %{_datadir}/icons/hicolor &>/dev/null
    /usr/bin/gtk-update-icon-cache %{_datadir}/icons/hicolor &>/dev/null || :
fi

%posttrans
/usr/bin/gtk-update-icon-cache %{_datadir}/icons/hicolor &>/dev/null || :

{{/if}}
%files
{{#each files}}
{{this}}
{{/each}}

%changelog
* {{changelog_date}} {{packager}} - {{version}}-{{release}}
- Converted from {{source_label}}
"#;

/// Values substituted into the spec template.
#[derive(Clone, Debug, Serialize)]
pub struct SpecContext {
    /// Sanitized package name.
    pub name: String,
    /// RPM-safe version.
    pub version: String,
    /// RPM-safe release.
    pub release: String,
    /// Single-line summary.
    pub summary: String,
    /// License expression.
    pub license: String,
    /// Homepage.
    pub url: Option<String>,
    /// Target architecture.
    pub build_arch: String,
    /// `Requires:` entries in order.
    pub requires: Vec<String>,
    /// Long description.
    pub description: String,
    /// `%files` entries, each an install path with optional attributes.
    pub files: Vec<String>,
    /// Whether hicolor icons are installed.
    pub has_icons: bool,
    /// Changelog date in `%a %b %d %Y` form.
    pub changelog_date: String,
    /// Changelog author.
    pub packager: String,
    /// What the package was converted from.
    pub source_label: String,
}

impl SpecContext {
    /// Builds the template values from resolved metadata.
    ///
    /// Free text is escaped so rpm does not expand it as macros.
    pub fn new(metadata: &ApplicationMetadata, name: &str, files: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            version: super::rpm_version(metadata.version()),
            release: super::rpm_version(metadata.release()),
            summary: escape_macros(&metadata.summary()),
            license: escape_macros(metadata.license()),
            url: metadata.url.as_deref().map(escape_macros),
            build_arch: rpm_arch().to_string(),
            requires: metadata.requires.clone(),
            description: escape_macros(&metadata.description()),
            files,
            has_icons: false,
            changelog_date: chrono::Local::now().format("%a %b %d %Y").to_string(),
            packager: "appimage2rpm".to_string(),
            source_label: "AppImage".to_string(),
        }
    }
}

/// Renders the spec file text.
pub fn render_spec(context: &SpecContext) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("spec", SPEC_TEMPLATE)?;
    Ok(handlebars.render("spec", context)?)
}

/// Doubles `%` so rpm keeps it literal.
pub fn escape_macros(text: &str) -> String {
    text.replace('%', "%%")
}

/// rpm's name for the host architecture.
pub fn rpm_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7hl",
        "powerpc64" => "ppc64le",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SpecContext {
        let metadata = ApplicationMetadata {
            name: Some("Demo App".into()),
            version: Some("2.1.0-beta".into()),
            summary: Some("100% useful".into()),
            license: Some("MIT".into()),
            url: Some("https://example.org".into()),
            requires: vec!["gtk3".into(), "libnotify".into()],
            ..Default::default()
        };
        let mut ctx = SpecContext::new(
            &metadata,
            "demo-app",
            vec![
                "/opt/demo-app".into(),
                "%attr(755,root,root) /usr/bin/demo-app".into(),
            ],
        );
        ctx.changelog_date = "Fri Oct 16 2026".into();
        ctx
    }

    #[test]
    fn test_render_header_and_requires() {
        let spec = render_spec(&context()).unwrap();
        assert!(spec.contains("Name:           demo-app\n"));
        assert!(spec.contains("Version:        2.1.0~beta\n"));
        assert!(spec.contains("Release:        1%{?dist}\n"));
        assert!(spec.contains("Summary:        100%% useful\n"));
        assert!(spec.contains("URL:            https://example.org\n"));
        assert!(spec.contains("AutoReqProv:    no\n"));
        let gtk = spec.find("Requires:       gtk3\n").unwrap();
        let notify = spec.find("Requires:       libnotify\n").unwrap();
        assert!(gtk < notify);
    }

    #[test]
    fn test_render_files_and_changelog() {
        let spec = render_spec(&context()).unwrap();
        assert!(spec.contains("%setup -q -c\n"));
        assert!(spec.contains("\n/opt/demo-app\n"));
        assert!(spec.contains("%attr(755,root,root) /usr/bin/demo-app\n"));
        assert!(spec.contains("* Fri Oct 16 2026 appimage2rpm - 2.1.0~beta-1\n"));
        assert!(!spec.contains("gtk-update-icon-cache"));
    }

    #[test]
    fn test_render_icon_scriptlets_and_optional_url() {
        let mut ctx = context();
        ctx.has_icons = true;
        ctx.url = None;
        ctx.requires.clear();
        let spec = render_spec(&ctx).unwrap();
        assert!(spec.contains("%posttrans\n/usr/bin/gtk-update-icon-cache"));
        assert!(!spec.contains("URL:"));
        assert!(!spec.contains("Requires:"));
    }

    #[test]
    fn test_summary_is_single_line() {
        let metadata = ApplicationMetadata {
            name: Some("Demo".into()),
            summary: Some("first line\nsecond line".into()),
            ..Default::default()
        };
        let ctx = SpecContext::new(&metadata, "demo", vec![]);
        assert_eq!(ctx.summary, "first line");
        assert_eq!(ctx.description, "first line");
    }
}
