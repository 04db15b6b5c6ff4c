use dioxus::logger::tracing::{info, Level};
use dioxus::prelude::*;
use lectern_core::{ElementStyles, Page};
use lectern_editor::services::{Conversion, ImageAsset, Modification, ModificationRequest};
use lectern_editor::{CodeModificationService, ImageAssetService, PersistenceService, ServiceError, SlideEditor};

const WORKSHEET: &str = r#"export default function Worksheet({ data }) {
  return (
    <div className="relative w-[960px] h-[540px] bg-sky-50">
      {/* Heading */}
      <h1 data-shape-key="heading" className="text-4xl font-bold text-sky-900" style={{position: 'absolute', left: '48px', top: '36px'}}>{data.heading}</h1>
      <p style={{position: 'absolute', left: '48px', top: '110px', width: '520px'}}>Label each part of the water cycle.</p>
      <img src="https://placehold.co/320x200" style={{position: 'absolute', left: '590px', top: '110px'}} />
    </div>
  );
}
"#;

/// Logs writes instead of sending them anywhere.
#[derive(Clone, PartialEq)]
struct ConsoleStore;

impl PersistenceService for ConsoleStore {
    async fn load_conversion(&self, conversion_id: &str) -> Result<Conversion, ServiceError> {
        Err(ServiceError::NotFound(conversion_id.to_string()))
    }

    async fn update_component_code(&self, component_id: &str, source_text: &str, _: &str) -> Result<(), ServiceError> {
        info!("component {} <- {} bytes", component_id, source_text.len());
        Ok(())
    }

    async fn update_slide_styles(&self, slide_id: &str, styles: &ElementStyles) -> Result<(), ServiceError> {
        info!("slide {} <- {} styled elements", slide_id, styles.len());
        Ok(())
    }

    async fn update_conversion_metadata(&self, id: &str, name: &str, _: Option<&str>) -> Result<(), ServiceError> {
        info!("conversion {} renamed to {}", id, name);
        Ok(())
    }
}

impl CodeModificationService for ConsoleStore {
    async fn modify(&self, request: ModificationRequest) -> Result<Modification, ServiceError> {
        Err(ServiceError::Remote(format!(
            "no rewrite service in the demo (asked: {})",
            request.instruction
        )))
    }
}

impl ImageAssetService for ConsoleStore {
    async fn list_images(&self) -> Result<Vec<ImageAsset>, ServiceError> {
        Ok(["320x200/png?text=Clouds", "320x200/png?text=Rain", "320x200/png?text=River"]
            .into_iter()
            .map(|path| ImageAsset {
                name: path.rsplit('=').next().unwrap_or(path).to_string(),
                url: format!("https://placehold.co/{}", path),
            })
            .collect())
    }

    async fn upload_image(&self, name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        info!("image {} <- {} bytes", name, bytes.len());
        Ok(format!("https://placehold.co/320x200/png?text={}", name))
    }
}

fn main() {
    dioxus::logger::init(Level::INFO).expect("failed to init logger");
    dioxus::launch(App);
}

fn App() -> Element {
    let mut worksheet = Page::new(1, "Water cycle", WORKSHEET, r#"{"heading":"Where does rain come from?"}"#);
    worksheet.component_id = Some("component-1".to_string());
    worksheet.slide_id = Some("slide-1".to_string());
    let conversion = Conversion {
        id: "conversion-1".to_string(),
        name: "Weather unit".to_string(),
        description: None,
        pages: vec![worksheet, Page::from_template(2, "Summary")],
    };

    rsx! {
        style {
            "{{
                body, html {{
                    margin: 0;
                    padding: 0;
                    height: 100%;
                    width: 100%;
                    overflow: hidden;
                }}
            }}"
        }
        SlideEditor { backend: ConsoleStore, conversion }
    }
}
