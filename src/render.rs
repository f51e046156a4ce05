//! Layout of the cover page and of the tutorial pages of a carry.
//!
//! Every artifact (the post of a single carry, the book of all of them) is drawn by the same
//! [`Renderer`], what changes between them is described by a [`PageTemplate`].

use std::collections::HashMap;

use image::{DynamicImage, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};

use crate::carry::Carry;
use crate::configuration::RenderConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::grid::GRID_SIDE;
use crate::pdf::{
    Color, ImageXObject, PdfDocument, RectanglePaint, TextAlignment, TextStyle,
};

/// Number of step images laid out on one tutorial page.
pub const STEPS_PER_PAGE: usize = GRID_SIDE * GRID_SIDE;

/// Horizontal gap between two columns of the tutorial grid, in points.
pub const GRID_GAP: f32 = 20.0;

pub const INCH: f32 = 72.0;
pub const A4: [f32; 2] = [595.2756, 841.8898];
pub const POST_SIZE: [f32; 2] = [630.0, 780.0];

pub const BLACK: Color = [0.0, 0.0, 0.0];
pub const WHITE: Color = [1.0, 1.0, 1.0];
pub const LIGHT_BLACK: Color = [51.0 / 255.0, 51.0 / 255.0, 51.0 / 255.0];
pub const FRONT_POST_BACKGROUND: Color = [226.0 / 255.0, 218.0 / 255.0, 219.0 / 255.0];
pub const FRONT_POST_LINE: Color = [178.0 / 255.0, 147.0 / 255.0, 146.0 / 255.0];
pub const BACK_POST_BACKGROUND: Color = [148.0 / 255.0, 136.0 / 255.0, 114.0 / 255.0];
pub const BACK_POST_LINE: Color = [100.0 / 255.0, 87.0 / 255.0, 69.0 / 255.0];
pub const BOOK_LINE: Color = [100.0 / 255.0, 87.0 / 255.0, 69.0 / 255.0];
pub const BOOK_BAND: Color = [239.0 / 255.0, 233.0 / 255.0, 226.0 / 255.0];

const TITLE_FONT_SIZE: f32 = 72.0;
const TITLE_LEADING: f32 = 60.0;
const FINISH_FONT_SIZE: f32 = 32.0;
const TITLE_FRAME_HEIGHT: f32 = 300.0;
const TITLE_FRAME_PADDING: f32 = 6.0;
const QR_MODULE_PIXELS: u32 = 10;
const QR_QUIET_ZONE: u32 = 4;

/// How the title and the finish are set above the tutorial grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderStyle {
    /// Text sitting on a rule spanning the page.
    Ruled { font_size: f32 },
    /// Larger text above two half rules, leaving room for the page number in between.
    Split { font_size: f32, color: Color },
}

/// Where the running page number of the tutorial pages is printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageNumberPlacement {
    Header { font_size: f32 },
    Footer { font_size: f32 },
}

/// Declarative description of the pages of an artifact, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTemplate {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Fill of the whole cover page.
    pub cover_background: Option<Color>,
    /// Horizontal band painted behind the cover image.
    pub cover_band: Option<Color>,
    /// Box `[x, y, width, height]` the cover image is fitted in.
    pub cover_image_box: [f32; 4],
    /// Bottom of the frame holding the title and the finish.
    pub title_frame_bottom: f32,
    pub text_color: Color,
    pub line_color: Color,
    pub header: HeaderStyle,
    pub page_number: PageNumberPlacement,
    pub inset_border: bool,
    /// The signature under the cover rule and in the footer of the tutorial pages.
    pub signature: bool,
    /// Difficulty and drop height under the cover rule.
    pub secondary_info: bool,
    pub qr_code: bool,
    /// Whether the cover page takes a page number (printed in its top right corner).
    pub numbered_cover: bool,
    /// Adds a page after the tutorial when it has an even number of pages.
    pub pad_to_even: bool,
}

/// Builds a [`PageTemplate`] starting from a plain A4 page with one inch margins.
#[derive(Debug, Clone)]
pub struct PageTemplateBuilder {
    template: PageTemplate,
}

impl Default for PageTemplateBuilder {
    fn default() -> Self {
        let [width, height] = A4;
        PageTemplateBuilder {
            template: PageTemplate {
                width,
                height,
                margin: INCH,
                cover_background: None,
                cover_band: None,
                cover_image_box: [INCH, INCH, width - 2.0 * INCH, height - 2.0 * INCH],
                title_frame_bottom: 2.0 * INCH,
                text_color: BLACK,
                line_color: LIGHT_BLACK,
                header: HeaderStyle::Ruled { font_size: 10.0 },
                page_number: PageNumberPlacement::Footer { font_size: 12.0 },
                inset_border: false,
                signature: false,
                secondary_info: false,
                qr_code: false,
                numbered_cover: false,
                pad_to_even: false,
            },
        }
    }
}

impl PageTemplateBuilder {
    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.template.width = width;
        self.template.height = height;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.template.margin = margin;
        self
    }

    pub fn cover_background(mut self, color: Color) -> Self {
        self.template.cover_background = Some(color);
        self
    }

    pub fn cover_band(mut self, color: Color) -> Self {
        self.template.cover_band = Some(color);
        self
    }

    pub fn cover_image_box(mut self, image_box: [f32; 4]) -> Self {
        self.template.cover_image_box = image_box;
        self
    }

    pub fn title_frame_bottom(mut self, y: f32) -> Self {
        self.template.title_frame_bottom = y;
        self
    }

    pub fn text_color(mut self, color: Color) -> Self {
        self.template.text_color = color;
        self
    }

    pub fn line_color(mut self, color: Color) -> Self {
        self.template.line_color = color;
        self
    }

    pub fn header(mut self, header: HeaderStyle) -> Self {
        self.template.header = header;
        self
    }

    pub fn page_number(mut self, placement: PageNumberPlacement) -> Self {
        self.template.page_number = placement;
        self
    }

    pub fn inset_border(mut self, enabled: bool) -> Self {
        self.template.inset_border = enabled;
        self
    }

    pub fn signature(mut self, enabled: bool) -> Self {
        self.template.signature = enabled;
        self
    }

    pub fn secondary_info(mut self, enabled: bool) -> Self {
        self.template.secondary_info = enabled;
        self
    }

    pub fn qr_code(mut self, enabled: bool) -> Self {
        self.template.qr_code = enabled;
        self
    }

    pub fn numbered_cover(mut self, enabled: bool) -> Self {
        self.template.numbered_cover = enabled;
        self
    }

    pub fn pad_to_even(mut self, enabled: bool) -> Self {
        self.template.pad_to_even = enabled;
        self
    }

    pub fn build(self) -> PageTemplate {
        self.template
    }
}

impl PageTemplate {
    pub fn builder() -> PageTemplateBuilder {
        PageTemplateBuilder::default()
    }

    /// The square-ish social media post, whose palette depends on the position of the carry.
    pub fn post(carry: &Carry) -> PageTemplate {
        let [width, height] = POST_SIZE;
        let margin = INCH;
        let (background, line, text) = if carry.is_back_carry() {
            (BACK_POST_BACKGROUND, BACK_POST_LINE, WHITE)
        } else {
            (FRONT_POST_BACKGROUND, FRONT_POST_LINE, BLACK)
        };

        PageTemplate::builder()
            .page_size(width, height)
            .margin(margin)
            .cover_background(background)
            .cover_image_box([
                width / 2.0 - 3.0 * margin,
                height / 2.0 - 4.5 * margin,
                width - 2.0 * margin,
                height - 2.0 * margin,
            ])
            .title_frame_bottom(2.0 * margin)
            .text_color(text)
            .line_color(line)
            .header(HeaderStyle::Split {
                font_size: 14.0,
                color: BACK_POST_LINE,
            })
            .page_number(PageNumberPlacement::Header { font_size: 32.0 })
            .inset_border(true)
            .signature(true)
            .build()
    }

    /// The printed catalog page, one cover and its tutorial per carry.
    pub fn book() -> PageTemplate {
        let [width, height] = A4;
        let margin = INCH;

        PageTemplate::builder()
            .page_size(width, height)
            .margin(margin)
            .cover_band(BOOK_BAND)
            .cover_image_box([
                (width - 200.0) / 2.0 + margin,
                (height - 350.0) / 2.0,
                (width - 2.0 * margin) * 0.6,
                (height - 2.0 * margin) * 0.6,
            ])
            .title_frame_bottom(height / 3.0 - margin)
            .text_color(LIGHT_BLACK)
            .line_color(BOOK_LINE)
            .header(HeaderStyle::Ruled { font_size: 10.0 })
            .page_number(PageNumberPlacement::Footer { font_size: 12.0 })
            .secondary_info(true)
            .qr_code(true)
            .numbered_cover(true)
            .pad_to_even(true)
            .build()
    }

    pub fn grid(&self) -> GridGeometry {
        GridGeometry::new(self.width, self.height, self.margin)
    }
}

/// Cell sizes of the 3×3 tutorial grid of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub margin: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub gap: f32,
}

impl GridGeometry {
    pub fn new(page_width: f32, page_height: f32, margin: f32) -> Self {
        let available_width = page_width - margin;
        let available_height = page_height - 2.0 * margin;

        GridGeometry {
            margin,
            cell_width: (available_width - 2.0 * GRID_GAP) / GRID_SIDE as f32,
            cell_height: available_height / GRID_SIDE as f32,
            gap: GRID_GAP,
        }
    }

    /// Bottom left corner of the cell holding the `slot`-th image of a page, filled row-major
    /// from the top.
    pub fn cell_origin(&self, slot: usize) -> [f32; 2] {
        let row = slot / GRID_SIDE;
        let column = slot % GRID_SIDE;

        [
            self.margin / 2.0 + column as f32 * (self.cell_width + self.gap),
            self.margin + (GRID_SIDE - 1 - row) as f32 * self.cell_height,
        ]
    }
}

/// Number of tutorial pages needed for the given number of steps.
pub fn pages_needed(step_count: usize) -> usize {
    step_count.div_ceil(STEPS_PER_PAGE)
}

/// Largest `[width, height]` with the aspect ratio of the image that fits in the box.
pub fn fit_within(image_width: u32, image_height: u32, box_width: f32, box_height: f32) -> [f32; 2] {
    if image_width == 0 || image_height == 0 {
        return [0.0, 0.0];
    }
    let ratio = (box_width / image_width as f32).min(box_height / image_height as f32);

    [image_width as f32 * ratio, image_height as f32 * ratio]
}

/// Greedy word wrapping, a word wider than the line is left alone on its own line.
pub fn wrap_text(text: &str, maximum_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }
        let candidate = format!("{current_line} {word}");
        if measure(&candidate) <= maximum_width {
            current_line = candidate;
        } else {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Renders the QR code of the text as a bitmap, dark modules in `color` over white.
pub fn qr_code_image(text: &str, color: Color) -> Result<DynamicImage, ContextError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::L).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Render,
            format!("Unable to encode {} as a QR code", text),
            &error,
        )
    })?;
    let module_count = code.width() as u32;
    let side = (module_count + 2 * QR_QUIET_ZONE) * QR_MODULE_PIXELS;
    let dark = Rgb(color.map(|component| (component * 255.0).round() as u8));
    let modules = code.to_colors();

    let image = RgbImage::from_fn(side, side, |x, y| {
        let module_x = (x / QR_MODULE_PIXELS).checked_sub(QR_QUIET_ZONE);
        let module_y = (y / QR_MODULE_PIXELS).checked_sub(QR_QUIET_ZONE);
        match (module_x, module_y) {
            (Some(module_x), Some(module_y))
                if module_x < module_count && module_y < module_count =>
            {
                match modules[(module_y * module_count + module_x) as usize] {
                    qrcode::Color::Dark => dark,
                    qrcode::Color::Light => Rgb([255, 255, 255]),
                }
            }
            _ => Rgb([255, 255, 255]),
        }
    });

    Ok(DynamicImage::ImageRgb8(image))
}

/// Indices of the loaded fonts, by role.
#[derive(Debug, Clone, Copy)]
struct FontSet {
    title: usize,
    finish: usize,
    body: usize,
    light: usize,
    page_number: usize,
}

/// Draws carries page after page into one PDF document.
pub struct Renderer<'a> {
    template: PageTemplate,
    configuration: &'a RenderConfiguration,
    pdf_document: PdfDocument,
    fonts: FontSet,
    page_number: usize,
}

impl<'a> Renderer<'a> {
    /// Starts an empty document and loads the fonts named by the configuration.
    pub fn new(
        template: PageTemplate,
        configuration: &'a RenderConfiguration,
        title: &str,
    ) -> Result<Self, ContextError> {
        let mut pdf_document = PdfDocument::new(title.to_string());

        let mut loaded = HashMap::<String, usize>::new();
        let mut load = |family: &str| -> Result<usize, ContextError> {
            if let Some(font_index) = loaded.get(family) {
                return Ok(*font_index);
            }
            let font_path = configuration.get_font_path(family).ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Configuration,
                    format!("No font file is associated to the font family {}", family),
                )
            })?;
            let font_index = pdf_document.add_font(&font_path)?;
            log::debug!("Loaded the font {} from {:?}", family, font_path);
            loaded.insert(family.to_string(), font_index);
            Ok(font_index)
        };
        let roles = &configuration.fonts;
        let fonts = FontSet {
            title: load(&roles.title)?,
            finish: load(&roles.finish)?,
            body: load(&roles.body)?,
            light: load(&roles.light)?,
            page_number: load(&roles.page_number)?,
        };

        Ok(Renderer {
            template,
            configuration,
            pdf_document,
            fonts,
            page_number: 0,
        })
    }

    pub fn template(&self) -> &PageTemplate {
        &self.template
    }

    /// The page number the last rendered page carries.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Draws the cover page of the carry; the cover image is optional for posts without artwork.
    pub fn render_cover_page(
        &mut self,
        carry: &Carry,
        cover_image: Option<&DynamicImage>,
    ) -> Result<(), ContextError> {
        let template = self.template.clone();
        let (width, height, margin) = (template.width, template.height, template.margin);
        let page = self.pdf_document.add_page(width, height);
        if template.numbered_cover {
            self.page_number += 1;
        }

        if let Some(background) = template.cover_background {
            self.pdf_document.draw_rectangle(
                page,
                [0.0, 0.0, width, height],
                RectanglePaint::Fill(background),
            )?;
        }
        if let Some(band) = template.cover_band {
            let bottom = height / 5.0 + 20.0;
            let top = 4.0 * height / 5.0 + 20.0;
            self.pdf_document.draw_rectangle(
                page,
                [0.0, bottom, width, top - bottom],
                RectanglePaint::Fill(band),
            )?;
        }

        if let Some(cover_image) = cover_image {
            let [x, y, box_width, box_height] = template.cover_image_box;
            let [image_width, image_height] =
                fit_within(cover_image.width(), cover_image.height(), box_width, box_height);
            self.pdf_document.draw_image(
                page,
                ImageXObject::from(cover_image),
                [x, y, image_width, image_height],
            )?;
        }

        self.draw_title(page, carry)?;

        if template.inset_border {
            self.pdf_document.draw_rectangle(
                page,
                [margin / 2.0, margin / 2.0, width - margin, height - margin],
                RectanglePaint::Stroke {
                    color: template.line_color,
                    thickness: 2.0,
                },
            )?;
        }

        // Rule closing the cover, with the signature or the secondary information above it.
        if template.signature || template.secondary_info {
            self.pdf_document.draw_line(
                page,
                [margin, margin],
                [width - margin - 20.0, margin],
                1.0,
                LIGHT_BLACK,
            )?;
        }
        let configuration = self.configuration;
        if template.signature {
            self.write(
                page,
                self.fonts.light,
                18.0,
                LIGHT_BLACK,
                &configuration.signature,
                [margin, margin + 12.0],
                TextAlignment::Left,
            )?;
        }
        if template.secondary_info {
            self.write(
                page,
                self.fonts.light,
                14.0,
                LIGHT_BLACK,
                &carry.difficulty,
                [margin, margin + 12.0],
                TextAlignment::Left,
            )?;
            self.write(
                page,
                self.fonts.light,
                14.0,
                LIGHT_BLACK,
                &carry.drop_height_offset,
                [margin, margin + 36.0],
                TextAlignment::Left,
            )?;
        }

        self.write(
            page,
            self.fonts.light,
            20.0,
            template.text_color,
            &format!("{} | {}", carry.position, carry.size),
            [margin, height * 2.15 / 3.0],
            TextAlignment::Left,
        )?;

        if template.numbered_cover {
            self.write(
                page,
                self.fonts.body,
                14.0,
                LIGHT_BLACK,
                &self.page_number.to_string(),
                [width - margin, height - margin],
                TextAlignment::Right,
            )?;
        }

        if template.qr_code {
            let qr_code = qr_code_image(&configuration.carry_url(&carry.name), LIGHT_BLACK)?;
            let side = width * 0.2;
            self.pdf_document.draw_image(
                page,
                ImageXObject::from(&qr_code),
                [width - side - 0.75 * margin, 0.75 * margin, side, side],
            )?;
        }

        log::debug!("Rendered the cover page of {}", carry.name);
        Ok(())
    }

    /// Draws the step images, nine per page, followed by a padding page when the template asks
    /// for an odd number of tutorial pages.
    pub fn render_tutorial_pages(
        &mut self,
        carry: &Carry,
        step_images: &[DynamicImage],
    ) -> Result<(), ContextError> {
        let grid = self.template.grid();
        let tutorial_pages = pages_needed(step_images.len());

        for chunk in step_images.chunks(STEPS_PER_PAGE) {
            let page = self
                .pdf_document
                .add_page(self.template.width, self.template.height);
            self.page_number += 1;

            for (slot, step_image) in chunk.iter().enumerate() {
                let [x, y] = grid.cell_origin(slot);
                let [image_width, image_height] = fit_within(
                    step_image.width(),
                    step_image.height(),
                    grid.cell_width,
                    grid.cell_height,
                );
                // Centred in its cell.
                let image_box = [
                    x + (grid.cell_width - image_width) / 2.0,
                    y + (grid.cell_height - image_height) / 2.0,
                    image_width,
                    image_height,
                ];
                self.pdf_document
                    .draw_image(page, ImageXObject::from(step_image), image_box)?;
            }

            self.draw_page_header(page, carry)?;
            self.draw_page_footer(page)?;
            log::debug!("Rendered page {:02} of {}", self.page_number, carry.name);
        }

        if self.template.pad_to_even && tutorial_pages > 0 && tutorial_pages % 2 == 0 {
            let page = self
                .pdf_document
                .add_page(self.template.width, self.template.height);
            self.page_number += 1;
            self.draw_page_footer(page)?;
        }

        Ok(())
    }

    /// Assembles the document, the renderer cannot be used afterwards.
    pub fn finish(mut self) -> Result<PdfDocument, ContextError> {
        self.pdf_document.write_all()?;
        self.pdf_document.optimize();

        Ok(self.pdf_document)
    }

    fn draw_title(&mut self, page: usize, carry: &Carry) -> Result<(), ContextError> {
        let template = &self.template;
        let frame_x = template.margin - 10.0 + TITLE_FRAME_PADDING;
        let frame_width = template.width - 2.0 * template.margin - 2.0 * TITLE_FRAME_PADDING;
        let frame_top = template.title_frame_bottom + TITLE_FRAME_HEIGHT - TITLE_FRAME_PADDING;
        let text_color = template.text_color;

        let title_font = self.fonts.title;
        let title_lines = wrap_text(&carry.title, frame_width, |text| {
            self.pdf_document
                .text_width(title_font, text, TITLE_FONT_SIZE)
                .unwrap_or(f32::MAX)
        });

        let mut baseline = frame_top - TITLE_FONT_SIZE;
        for (line_index, line) in title_lines.iter().enumerate() {
            if line_index > 0 {
                baseline -= TITLE_LEADING;
            }
            self.write(
                page,
                title_font,
                TITLE_FONT_SIZE,
                text_color,
                line,
                [frame_x, baseline],
                TextAlignment::Left,
            )?;
        }

        if !carry.finish.is_empty() {
            self.write(
                page,
                self.fonts.finish,
                FINISH_FONT_SIZE,
                text_color,
                &carry.finish,
                [frame_x, baseline - 25.0 - FINISH_FONT_SIZE],
                TextAlignment::Left,
            )?;
        }

        Ok(())
    }

    fn draw_page_header(&mut self, page: usize, carry: &Carry) -> Result<(), ContextError> {
        let (width, height, margin) = (self.template.width, self.template.height, self.template.margin);
        let line_y = height - margin;

        let (header_y, font_size, color) = match self.template.header {
            HeaderStyle::Ruled { font_size } => {
                self.pdf_document.draw_line(
                    page,
                    [margin / 2.0, line_y],
                    [width - margin / 2.0, line_y],
                    1.0,
                    LIGHT_BLACK,
                )?;
                (line_y + 5.0, font_size, LIGHT_BLACK)
            }
            HeaderStyle::Split { font_size, color } => {
                let rule_y = height - margin / 1.5;
                let rule_width = width / 2.0 - margin / 2.0;
                self.pdf_document
                    .draw_line(page, [0.0, rule_y], [rule_width, rule_y], 1.0, color)?;
                self.pdf_document.draw_line(
                    page,
                    [width / 2.0 + margin / 2.0, rule_y],
                    [width / 2.0 + margin / 2.0 + rule_width, rule_y],
                    1.0,
                    color,
                )?;
                (line_y + 30.0, font_size, color)
            }
        };

        self.write(
            page,
            self.fonts.finish,
            font_size,
            color,
            &carry.title,
            [margin / 2.0, header_y],
            TextAlignment::Left,
        )?;
        self.write(
            page,
            self.fonts.finish,
            font_size,
            color,
            &carry.finish,
            [width - margin / 2.0, header_y],
            TextAlignment::Right,
        )?;

        if let PageNumberPlacement::Header { font_size } = self.template.page_number {
            self.write(
                page,
                self.fonts.page_number,
                font_size,
                color,
                &format!("{:02}", self.page_number),
                [width / 2.0, height - 55.0],
                TextAlignment::Centered,
            )?;
        }

        Ok(())
    }

    fn draw_page_footer(&mut self, page: usize) -> Result<(), ContextError> {
        let (width, margin) = (self.template.width, self.template.margin);
        let line_y = 0.75 * margin;
        let color = match self.template.header {
            HeaderStyle::Split { color, .. } => color,
            HeaderStyle::Ruled { .. } => LIGHT_BLACK,
        };

        self.pdf_document.draw_line(
            page,
            [width / 2.0 - margin, line_y],
            [width / 2.0 + margin, line_y],
            1.0,
            color,
        )?;

        if let PageNumberPlacement::Footer { font_size } = self.template.page_number {
            self.write(
                page,
                self.fonts.page_number,
                font_size,
                color,
                &format!("{:02}", self.page_number),
                [width / 2.0, line_y - 12.0],
                TextAlignment::Centered,
            )?;
        }
        if self.template.signature {
            let configuration = self.configuration;
            self.write(
                page,
                self.fonts.light,
                12.0,
                color,
                &configuration.signature,
                [width / 2.0, line_y - 16.0],
                TextAlignment::Centered,
            )?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        page: usize,
        font_index: usize,
        font_size: f32,
        color: Color,
        text: &str,
        position: [f32; 2],
        alignment: TextAlignment,
    ) -> Result<(), ContextError> {
        let style = TextStyle {
            font_index,
            font_size,
            color,
        };
        self.pdf_document
            .write_text(page, style, text, position, alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carry(position: &str) -> Carry {
        Carry {
            name: "giselles".into(),
            title: "Giselle's".into(),
            finish: "Tied Under Bum".into(),
            position: position.into(),
            size: "BASE -1".into(),
            difficulty: "Difficulty: Beginner".into(),
            drop_height_offset: "DH: center".into(),
        }
    }

    #[test]
    fn tutorial_pages_hold_nine_steps() {
        assert_eq!(pages_needed(0), 0);
        assert_eq!(pages_needed(1), 1);
        assert_eq!(pages_needed(9), 1);
        assert_eq!(pages_needed(10), 2);
        assert_eq!(pages_needed(18), 2);
    }

    #[test]
    fn grid_is_filled_row_major_from_the_top() {
        let grid = GridGeometry::new(630.0, 780.0, 72.0);
        assert_eq!(grid.cell_width, (630.0 - 72.0 - 40.0) / 3.0);
        assert_eq!(grid.cell_height, (780.0 - 144.0) / 3.0);

        let [first_x, first_y] = grid.cell_origin(0);
        assert_eq!(first_x, 36.0);
        assert_eq!(first_y, 72.0 + 2.0 * grid.cell_height);

        let [third_x, third_y] = grid.cell_origin(2);
        assert_eq!(third_x, 36.0 + 2.0 * (grid.cell_width + 20.0));
        assert_eq!(third_y, first_y);

        let [last_x, last_y] = grid.cell_origin(8);
        assert_eq!(last_x, third_x);
        assert_eq!(last_y, 72.0);
    }

    #[test]
    fn images_keep_their_aspect_ratio() {
        assert_eq!(fit_within(100, 50, 200.0, 200.0), [200.0, 100.0]);
        assert_eq!(fit_within(50, 100, 200.0, 100.0), [50.0, 100.0]);
        assert_eq!(fit_within(0, 100, 200.0, 100.0), [0.0, 0.0]);
    }

    #[test]
    fn words_are_wrapped_greedily() {
        // One point per character.
        let measure = |text: &str| text.chars().count() as f32;

        similar_asserts::assert_eq!(
            wrap_text("Anne's Knotless Front Pocket", 15.0, measure),
            vec!["Anne's Knotless", "Front Pocket"]
        );
        assert_eq!(wrap_text("Supercalifragilistic", 5.0, measure), vec!["Supercalifragilistic"]);
        assert!(wrap_text("   ", 5.0, measure).is_empty());
    }

    #[test]
    fn post_palette_follows_the_position() {
        let back = PageTemplate::post(&carry("BACK CARRY"));
        assert_eq!(back.cover_background, Some(BACK_POST_BACKGROUND));
        assert_eq!(back.text_color, WHITE);
        assert_eq!(back.line_color, BACK_POST_LINE);

        let front = PageTemplate::post(&carry("FRONT CARRY"));
        assert_eq!(front.cover_background, Some(FRONT_POST_BACKGROUND));
        assert_eq!(front.text_color, BLACK);
        assert_eq!((front.width, front.height), (630.0, 780.0));
        assert!(!front.qr_code);
    }

    #[test]
    fn book_template_links_to_the_carry_page() {
        let book = PageTemplate::book();

        assert!(book.qr_code && book.secondary_info && book.numbered_cover && book.pad_to_even);
        assert!(!book.signature);
        assert_eq!([book.width, book.height], A4);
    }

    #[test]
    fn builder_overrides_the_defaults() {
        let template = PageTemplate::builder()
            .page_size(100.0, 200.0)
            .margin(10.0)
            .qr_code(true)
            .build();

        assert_eq!((template.width, template.height, template.margin), (100.0, 200.0, 10.0));
        assert!(template.qr_code);
        assert_eq!(template.cover_background, None);
    }

    #[test]
    fn qr_codes_are_square_with_a_quiet_zone() {
        let image = qr_code_image("https://thewrappinggallery.com/carry/giselles", LIGHT_BLACK)
            .unwrap()
            .to_rgb8();

        assert_eq!(image.width(), image.height());
        assert_eq!(image.width() % QR_MODULE_PIXELS, 0);
        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 255, 255]));
        // The top left finder pattern starts right after the quiet zone.
        let corner = QR_QUIET_ZONE * QR_MODULE_PIXELS;
        assert_eq!(*image.get_pixel(corner, corner), Rgb([51, 51, 51]));
    }
}
