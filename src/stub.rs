//! The `README-local.md` guide written next to extracted documentation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{FetchError, Result};

pub const STUB_FILE_NAME: &str = "README-local.md";

/// Write the local viewing guide into `extract_path` and return its path.
///
/// `site` is the documentation site root used for the original URL.
pub fn write_stub(name: &str, version: &str, extract_path: &Path, site: &str) -> Result<PathBuf> {
    let stub_path = extract_path.join(STUB_FILE_NAME);
    let content = render_stub(name, version, extract_path, site);

    std::fs::write(&stub_path, content).map_err(|e| FetchError::io(&stub_path, e))?;
    info!("Created local viewing guide: {}", stub_path.display());

    Ok(stub_path)
}

fn render_stub(name: &str, version: &str, extract_path: &Path, site: &str) -> String {
    let dir = extract_path.display();
    let site = site.trim_end_matches('/');

    format!(
        r##"# {name} v{version} Documentation

Downloaded from docs.rs and extracted to this directory.

## Local Viewing

### Option 1: Python HTTP Server (Recommended)
```bash
cd "{dir}"
python -m http.server 8000
# Then visit: http://localhost:8000
```

### Option 2: Node.js HTTP Server
```bash
cd "{dir}"
npx serve -p 8000
# Then visit: http://localhost:8000
```

### Option 3: Live Server (if you have VS Code)
```bash
cd "{dir}"
# Open in VS Code and use Live Server extension
```

## Directory Structure

- `index.html` - Main documentation page
- `search-index.js` - Search functionality
- `settings.js` - Documentation settings
- `source-files.js` - Source code references
- Crate documentation in subdirectories by target platform

## Search and Navigation

- Use the search box in the documentation to find specific items
- Navigation is available on the left sidebar
- Source code links are available for documented items

## Important Notes

- Static resources are loaded from `/-/rustdoc.static/` (requires internet)
- For complete offline viewing, you may need to download additional resources
- Some features may not work without an internet connection

## Original Source

- Crate: {name}
- Version: {version}
- Original URL: {site}/{name}/{version}/

---

*Generated by docfetch*
"##
    )
}
