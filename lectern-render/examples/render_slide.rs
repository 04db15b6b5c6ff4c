use lectern_core::{ElementTarget, Geometry, Page, StyleSnapshot};
use lectern_render::Renderer;
use std::fs::File;
use std::io::Write;

const LESSON: &str = r#"import React from 'react';

export default function Lesson({ data }) {
  return (
    <div className="relative w-[960px] h-[540px] bg-amber-50">
      {/* Heading */}
      <h1 data-shape-key="heading" className="text-5xl font-bold" style={{position: 'absolute', left: '40px', top: '40px'}}>{data.heading}</h1>
      <ul className="absolute left-10 top-40 text-2xl">
        <li>Photosynthesis needs light</li>
        <li>Chlorophyll absorbs red and blue</li>
      </ul>
      <img src="https://placehold.co/240x160" style={{position: 'absolute', left: '680px', top: '320px'}} />
    </div>
  );
}
"#;

fn main() {
    let mut page = Page::new(1, "Plants", LESSON, r#"{"heading":"How plants eat"}"#);

    println!("Applying a drag and a text edit...");
    page.model
        .patch_element_geometry(&ElementTarget::Key("heading".into()), Geometry::at(64.0, 32.0));
    let mut edit = StyleSnapshot::default();
    edit.text_content = Some("Light makes sugar".to_string());
    page.model.patch_element_content_and_style(&ElementTarget::Index(3), &edit);

    println!("Rendering...");
    let renderer = Renderer::default();
    let start = std::time::Instant::now();
    let document = renderer.render_page(&page).expect("Failed to render");
    println!(
        "Rendered <{}> with {} editable elements in {:?}",
        document.root_component,
        document.element_count,
        start.elapsed()
    );

    let mut file = File::create("slide_test.html").unwrap();
    file.write_all(document.html.as_bytes()).unwrap();
    println!("Saved to slide_test.html (open it in a browser)");
}
