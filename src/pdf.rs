//! A small PDF writer on top of `lopdf`: pages measured in points, embedded TrueType fonts,
//! text, strokes, rectangles and raster images.

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{BTreeMap, HashMap},
    io::BufWriter,
    mem,
    path::Path,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};

/// An RGB color with components in `0.0..=1.0`.
pub type Color = [f32; 3];

/// Builds a color from 8-bit components.
pub fn rgb8(red: u8, green: u8, blue: u8) -> Color {
    [red as f32 / 255.0, green as f32 / 255.0, blue as f32 / 255.0]
}

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    pub ascent: i16,
    pub descent: i16,
    pub units_per_em: u16,
}

/// The (insofar) relevant metrics associated to a single glyph of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
}

/// A font face loaded from a TTF font, together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    inner: std::sync::Arc<owned_ttf_parser::OwnedFace>,
    units_per_em: u16,
}

impl TtfFontFace {
    fn from_bytes(data: &[u8]) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.to_vec(), 0).map_err(|error| {
            ContextError::with_error(ErrorKind::Render, "Failed to parse font", &error)
        })?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: std::sync::Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    /// Mapping from every glyph reachable through a Unicode cmap subtable to its character.
    fn glyph_ids(&self) -> HashMap<u16, char> {
        let Some(cmap) = self.face().tables().cmap else {
            return HashMap::new();
        };

        let mut glyph_to_character = HashMap::with_capacity(self.glyph_count().into());
        for subtable in cmap.subtables.into_iter().filter(|subtable| subtable.is_unicode()) {
            subtable.codepoints(|codepoint| {
                let Ok(character) = char::try_from(codepoint) else {
                    return;
                };
                if let Some(glyph_index) = subtable
                    .glyph_index(codepoint)
                    .filter(|index| index.0 > 0)
                {
                    glyph_to_character.entry(glyph_index.0).or_insert(character);
                }
            })
        }

        glyph_to_character
    }

    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);
        let width = self.face().glyph_hor_advance(glyph_id)? as u32;
        // Horizontal fonts only: the descender is folded into the glyph height.
        let height = self
            .face()
            .glyph_bounding_box(glyph_id)
            .map(|bounding_box| {
                i32::from(bounding_box.y_max) - i32::from(bounding_box.y_min)
                    - i32::from(self.face().descender())
            })
            .unwrap_or(1000)
            .max(0) as u32;

        Some(GlyphMetrics { width, height })
    }
}

/// A font loaded from a TTF file, identified in the page resources by `face_identifier`.
#[derive(Debug, Clone)]
pub struct Font {
    bytes: Vec<u8>,
    ttf_face: TtfFontFace,
    face_identifier: String,
}

impl Font {
    /// Width of the text in points once set at the given size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units_per_em = self.ttf_face.units_per_em as f32;
        let advance: u32 = text
            .nfc()
            .filter_map(|character| self.ttf_face.glyph_id(character))
            .filter_map(|glyph_id| self.ttf_face.glyph_metrics(glyph_id))
            .map(|metrics| metrics.width)
            .sum();

        advance as f32 * font_size / units_per_em
    }

    fn glyph_bytes(&self, text: &str) -> Vec<u8> {
        let mut glyph_ids = Vec::<u16>::new();
        for character in text.nfc() {
            match self.ttf_face.glyph_id(character) {
                Some(glyph_id) => glyph_ids.push(glyph_id),
                None => log::warn!(
                    "Unable to find the character {:?} in the font {}",
                    character,
                    self.face_identifier
                ),
            }
        }

        glyph_ids
            .iter()
            .flat_map(|glyph_id| glyph_id.to_be_bytes())
            .collect()
    }

    /// Embeds the font as a Type0 font with an Identity-H encoding and returns its dictionary.
    fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let face_metrics = self.ttf_face.font_metrics();

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.clone(),
        )
        .with_compression(false);

        let mut font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("FontDescriptor".into())),
            ("FontName", Name(self.face_identifier.clone().into_bytes())),
            ("Ascent", Integer(i64::from(face_metrics.ascent))),
            ("Descent", Integer(i64::from(face_metrics.descent))),
            ("CapHeight", Integer(i64::from(face_metrics.ascent))),
            ("ItalicAngle", Integer(0)),
            // Nonsymbolic, Adobe standard Latin character set.
            ("Flags", Integer(32)),
            ("StemV", Integer(80)),
        ]);

        let mut maximum_character_height = 0;
        let mut total_width = 0;
        // Glyph ID -> (character, width).
        let mut glyph_properties = BTreeMap::<u32, (u32, u32)>::new();
        glyph_properties.insert(0, (0, 1000));
        for (glyph_id, character) in self.ttf_face.glyph_ids() {
            if let Some(glyph_metrics) = self.ttf_face.glyph_metrics(glyph_id) {
                maximum_character_height = maximum_character_height.max(glyph_metrics.height);
                total_width += glyph_metrics.width;
                glyph_properties.insert(glyph_id as u32, (character as u32, glyph_metrics.width));
            }
        }

        // A bfchar block may hold at most 100 entries sharing the same high byte.
        let mut cmap_blocks = Vec::new();
        let mut current_block = Vec::new();
        let mut current_high_byte = 0;
        for (glyph_id, (character, _)) in glyph_properties.iter() {
            if glyph_id >> 8 != current_high_byte || current_block.len() >= 100 {
                cmap_blocks.push(mem::take(&mut current_block));
                current_high_byte = glyph_id >> 8;
            }
            current_block.push((*glyph_id, *character));
        }
        cmap_blocks.push(current_block);

        let to_unicode_map = generate_cid_to_unicode_map(&self.face_identifier, cmap_blocks);
        let to_unicode_id = inner_document.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            to_unicode_map.into_bytes(),
        ));

        // Widths are written as `first [w1 w2 ...]` runs of consecutive glyph IDs, in 1000ths of an em.
        let scaling = 1000.0 / (face_metrics.units_per_em as f32);
        let mut width_objects = Vec::<Object>::new();
        let mut run_start = 0;
        let mut run_end = 0;
        let mut run_widths = Vec::<Object>::new();
        for glyph_id in 0..self.ttf_face.glyph_count() {
            let Some(GlyphMetrics { width, .. }) = self.ttf_face.glyph_metrics(glyph_id) else {
                log::warn!(
                    "Glyph ID {} of the font {} has no width, skipping it",
                    glyph_id,
                    self.face_identifier
                );
                continue;
            };
            if glyph_id != run_end {
                width_objects.push(Integer(run_start as i64));
                width_objects.push(Array(mem::take(&mut run_widths)));
                run_start = glyph_id;
            }
            run_widths.push(Integer((width as f32 * scaling) as i64));
            run_end = glyph_id + 1;
        }
        width_objects.push(Integer(run_start as i64));
        width_objects.push(Array(run_widths));

        font_descriptor.set(
            "FontFile2",
            Reference(inner_document.add_object(font_stream)),
        );
        font_descriptor.set(
            "FontBBox",
            Array(vec![
                Integer(0),
                Integer(maximum_character_height as i64),
                Integer(total_width as i64),
                Integer(maximum_character_height as i64),
            ]),
        );
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(self.face_identifier.clone().into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
            ("FontDescriptor", Reference(font_descriptor_id)),
        ]);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type0".into())),
            ("BaseFont", Name(self.face_identifier.clone().into_bytes())),
            ("Encoding", Name("Identity-H".into())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(to_unicode_id)),
        ])
    }
}

/// An 8-bit RGB raster image, drawn through an image XObject.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub rgb_data: Vec<u8>,
}

impl From<&image::DynamicImage> for ImageXObject {
    fn from(image: &image::DynamicImage) -> Self {
        let rgb_image = image.to_rgb8();
        ImageXObject {
            width: rgb_image.width(),
            height: rgb_image.height(),
            rgb_data: rgb_image.into_raw(),
        }
    }
}

impl From<ImageXObject> for lopdf::Stream {
    fn from(value: ImageXObject) -> Self {
        use lopdf::Object::*;
        lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![
                ("Type", Name("XObject".into())),
                ("Subtype", Name("Image".into())),
                ("Width", Integer(i64::from(value.width))),
                ("Height", Integer(i64::from(value.height))),
                ("ColorSpace", Name("DeviceRGB".into())),
                ("BitsPerComponent", Integer(8)),
            ]),
            value.rgb_data,
        )
    }
}

/// How text is anchored on the given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Right,
    Centered,
}

/// Font, size and fill color of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_index: usize,
    pub font_size: f32,
    pub color: Color,
}

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RectanglePaint {
    Fill(Color),
    Stroke { color: Color, thickness: f32 },
}

/// One page of the document, its size is in points.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: f32,
    pub height: f32,
    operations: Vec<Operation>,
    images: Vec<(String, ImageXObject)>,
}

/// A PDF document under construction. Pages and fonts are referred to by the indices returned
/// when they are added.
#[derive(Debug)]
pub struct PdfDocument {
    fonts: BTreeMap<String, (lopdf::ObjectId, Font)>,
    pub inner_document: lopdf::Document,
    pub identifier: String,
    pub title: String,
    pub creation_date: OffsetDateTime,
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    pub fn new(identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document: lopdf::Document::with_version("1.5"),
            title: identifier.clone(),
            identifier,
            creation_date: OffsetDateTime::now_utc(),
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends an empty page and returns its index.
    pub fn add_page(&mut self, width: f32, height: f32) -> usize {
        self.pages.push(PdfPage {
            width,
            height,
            operations: Vec::new(),
            images: Vec::new(),
        });

        self.pages.len() - 1
    }

    /// Loads a TTF (or TrueType-flavoured OTF) font and returns its index.
    pub fn add_font(&mut self, font_path: &Path) -> Result<usize, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to read the font {:?}", font_path),
                &error,
            )
        })?;

        self.add_font_bytes(font_bytes)
    }

    pub fn add_font_bytes(&mut self, font_bytes: Vec<u8>) -> Result<usize, ContextError> {
        let ttf_face = TtfFontFace::from_bytes(&font_bytes)?;
        let font = Font {
            bytes: font_bytes,
            ttf_face,
            face_identifier: format!("F{}", self.fonts.len()),
        };
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font.face_identifier.clone(), (font_object_id, font));

        Ok(self.fonts.len() - 1)
    }

    /// Width in points of the text set in the given font and size.
    pub fn text_width(
        &self,
        font_index: usize,
        text: &str,
        font_size: f32,
    ) -> Result<f32, ContextError> {
        Ok(self.get_font(font_index)?.text_width(text, font_size))
    }

    /// Writes a single line of text, `position` being the baseline anchor given by `alignment`.
    pub fn write_text(
        &mut self,
        page_index: usize,
        style: TextStyle,
        text: &str,
        position: [f32; 2],
        alignment: TextAlignment,
    ) -> Result<(), ContextError> {
        let font = self.get_font(style.font_index)?;
        let width = font.text_width(text, style.font_size);
        let glyph_bytes = font.glyph_bytes(text);
        let face_identifier = font.face_identifier.clone();

        let [x, y] = position;
        let x = match alignment {
            TextAlignment::Left => x,
            TextAlignment::Right => x - width,
            TextAlignment::Centered => x - width / 2.0,
        };
        let [red, green, blue] = style.color;

        self.get_mut_page(page_index)?.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![face_identifier.into(), style.font_size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("rg", vec![red.into(), green.into(), blue.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(glyph_bytes, StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    /// Strokes a straight line.
    pub fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        thickness: f32,
        color: Color,
    ) -> Result<(), ContextError> {
        let [red, green, blue] = color;
        self.get_mut_page(page_index)?.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![thickness.into()]),
            Operation::new("RG", vec![red.into(), green.into(), blue.into()]),
            Operation::new("m", vec![from[0].into(), from[1].into()]),
            Operation::new("l", vec![to[0].into(), to[1].into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Paints the rectangle whose bottom left corner is at `(x, y)`.
    pub fn draw_rectangle(
        &mut self,
        page_index: usize,
        [x, y, width, height]: [f32; 4],
        paint: RectanglePaint,
    ) -> Result<(), ContextError> {
        let mut operations = vec![Operation::new("q", vec![])];
        let painting_operator = match paint {
            RectanglePaint::Fill([red, green, blue]) => {
                operations.push(Operation::new(
                    "rg",
                    vec![red.into(), green.into(), blue.into()],
                ));
                "f"
            }
            RectanglePaint::Stroke {
                color: [red, green, blue],
                thickness,
            } => {
                operations.push(Operation::new("w", vec![thickness.into()]));
                operations.push(Operation::new(
                    "RG",
                    vec![red.into(), green.into(), blue.into()],
                ));
                "S"
            }
        };
        operations.extend([
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new(painting_operator, vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.get_mut_page(page_index)?.operations.extend(operations);

        Ok(())
    }

    /// Draws the image stretched over the rectangle whose bottom left corner is at `(x, y)`.
    pub fn draw_image(
        &mut self,
        page_index: usize,
        image: ImageXObject,
        [x, y, width, height]: [f32; 4],
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let image_name = format!("X{}", page.images.len());
        page.images.push((image_name.clone(), image));
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Assembles the catalog, the page tree, the resources and the document information.
    /// Must be called exactly once, after the last drawing operation.
    pub fn write_all(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::Literal;

        let timestamp = to_pdf_timestamp_format(&self.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", String(self.title.clone().into_bytes(), Literal)),
            ("Creator", String(b"carrybook".to_vec(), Literal)),
            ("Producer", String(b"carrybook".to_vec(), Literal)),
            ("CreationDate", String(timestamp.clone().into_bytes(), Literal)),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(document_info);

        let pages_id = self.inner_document.new_object_id();
        let catalog_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]));
        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(self.identifier.clone().into_bytes(), Literal),
            ]),
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<Object>::with_capacity(self.pages.len());
        for page in mem::take(&mut self.pages) {
            let mut xobjects = lopdf::Dictionary::new();
            for (image_name, image) in page.images {
                let image_stream: lopdf::Stream = image.into();
                xobjects.set(
                    image_name,
                    Reference(self.inner_document.add_object(image_stream)),
                );
            }
            let mut resources =
                lopdf::Dictionary::from_iter(vec![("Font", Reference(fonts_dictionary_id))]);
            if !xobjects.is_empty() {
                resources.set("XObject", Dictionary(xobjects));
            }

            let mut operations = Vec::with_capacity(page.operations.len() + 2);
            operations.push(Operation::new("q", vec![]));
            operations.extend(page.operations);
            operations.push(Operation::new("Q", vec![]));
            let content = lopdf::content::Content { operations }
                .encode()
                .map_err(|error| {
                    ContextError::with_error(
                        ErrorKind::Render,
                        "Failed to encode the page content",
                        &error,
                    )
                })?;
            let content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content));

            let media_box: Object = vec![
                Integer(0),
                Integer(0),
                page.width.into(),
                page.height.into(),
            ]
            .into();
            let page_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Parent", Reference(pages_id)),
                ("MediaBox", media_box.clone()),
                ("CropBox", media_box),
                ("Resources", Dictionary(resources)),
                ("Contents", Reference(content_id)),
            ]));
            page_ids.push(Reference(page_id));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Drops unused objects and compresses the streams.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Render,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    pub fn save_to_file(&mut self, path: &Path) -> Result<(), ContextError> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to write the PDF document {:?}", path),
                &error,
            )
        })
    }

    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();
        for (face_identifier, (font_object_id, font)) in self.fonts.iter() {
            let embedded_font = font.insert_into_document(&mut self.inner_document);
            self.inner_document
                .objects
                .insert(*font_object_id, Object::Dictionary(embedded_font));
            font_dictionary.set(face_identifier.clone(), Object::Reference(*font_object_id));
        }

        font_dictionary
    }

    fn get_font(&self, font_index: usize) -> Result<&Font, ContextError> {
        self.fonts
            .get(&format!("F{font_index}"))
            .map(|(_, font)| font)
            .ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Render,
                    format!("Failed to find font {} into the fonts map", font_index),
                )
            })
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the page with index {}", page_index),
            )
        })
    }
}

type GlyphId = u32;
type UnicodeCodePoint = u32;
type CmapBlock = Vec<(GlyphId, UnicodeCodePoint)>;

/// Builds the ToUnicode CMap out of `beginbfchar` blocks.
fn generate_cid_to_unicode_map(face_name: &str, cmap_blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map = format!(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /{face_name}-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <ffff>\n\
         endcodespacerange\n"
    );

    for cmap_block in cmap_blocks.into_iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\n", cmap_block.len()));
        for (glyph_id, unicode) in cmap_block {
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{unicode:04x}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\n");
    }

    cid_to_unicode_map.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );

    cid_to_unicode_map
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    fn reloaded(pdf_document: &mut PdfDocument) -> lopdf::Document {
        pdf_document.write_all().unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();
        lopdf::Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn pages_keep_their_size_in_points() {
        let mut pdf_document = PdfDocument::new("sizes".into());
        pdf_document.add_page(630.0, 780.0);
        pdf_document.add_page(595.0, 842.0);
        let document = reloaded(&mut pdf_document);

        let pages = document.get_pages();
        assert_eq!(pages.len(), 2);
        let first_page = document.get_dictionary(pages[&1]).unwrap();
        let media_box = first_page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 630.0);
        assert_eq!(media_box[3].as_float().unwrap(), 780.0);
    }

    #[test]
    fn shapes_and_images_end_up_in_the_content_stream() {
        let mut pdf_document = PdfDocument::new("shapes".into());
        let page = pdf_document.add_page(200.0, 200.0);
        pdf_document
            .draw_rectangle(page, [0.0, 0.0, 200.0, 200.0], RectanglePaint::Fill(rgb8(226, 218, 219)))
            .unwrap();
        pdf_document
            .draw_line(page, [10.0, 10.0], [190.0, 10.0], 1.0, rgb8(51, 51, 51))
            .unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([10, 20, 30])));
        pdf_document
            .draw_image(page, ImageXObject::from(&image), [20.0, 20.0, 40.0, 20.0])
            .unwrap();
        let document = reloaded(&mut pdf_document);

        let page_id = document.get_pages()[&1];
        let content = document.get_and_decode_page_content(page_id).unwrap();
        let operators: Vec<&str> = content
            .operations
            .iter()
            .map(|operation| operation.operator.as_str())
            .collect();
        for operator in ["re", "f", "m", "l", "S", "cm", "Do"] {
            assert!(operators.contains(&operator), "missing {operator}");
        }

        let (resources, _) = document.get_page_resources(page_id);
        let xobjects = resources.unwrap().get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"X0").unwrap().as_reference().unwrap();
        let image_stream = document.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image_stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(image_stream.content, vec![10, 20, 30].repeat(8));
    }

    #[test]
    fn drawing_on_a_missing_page_fails() {
        let mut pdf_document = PdfDocument::new("missing".into());
        let error = pdf_document
            .draw_line(3, [0.0, 0.0], [1.0, 1.0], 1.0, rgb8(0, 0, 0))
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Render);
    }

    #[test]
    fn unknown_font_index_fails() {
        let mut pdf_document = PdfDocument::new("fonts".into());
        let page = pdf_document.add_page(100.0, 100.0);
        let style = TextStyle {
            font_index: 0,
            font_size: 12.0,
            color: rgb8(0, 0, 0),
        };

        assert!(pdf_document
            .write_text(page, style, "Giselle's", [10.0, 10.0], TextAlignment::Left)
            .is_err());
        assert!(pdf_document.add_font_bytes(b"not a font".to_vec()).is_err());
    }

    #[test]
    fn cmap_blocks_are_wrapped_in_bfchar_sections() {
        let cmap = generate_cid_to_unicode_map("F0", vec![vec![(1, 0x41), (2, 0x42)], vec![]]);

        assert!(cmap.contains("/CMapName /F0-UCS def"));
        assert!(cmap.contains("2 beginbfchar\n<0001> <0041>\n<0002> <0042>\nendbfchar\n"));
        assert_eq!(cmap.matches("beginbfchar").count(), 1);
    }

    #[test]
    fn timestamps_follow_the_pdf_date_format() {
        let date = time::macros::datetime!(2017-05-05 15:02:24 +02:00);

        assert_eq!(to_pdf_timestamp_format(&date), "D:20170505150224+02'00'");
    }
}
