//! PDF report layout
//!
//! The report is built as a list of blocks of fixed-height elements, paged
//! top-down on A4 with one-inch margins, then written with `pdf-writer`.
//! Text uses the standard Helvetica fonts with WinAnsi encoding.

use super::Exporter;
use crate::error::AnalyticsResult;
use crate::schemas::{ChartImage, QuestionAnalysis, SurveyAnalysisResult};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use survey_common::QuestionType;
use tracing::{debug, warn};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const FOOTER_Y: f32 = 36.0;
const ROW_HEIGHT: f32 = 20.0;

/// Chart sizes in points
const CHART_WIDTH: f32 = 360.0;
const CHART_HEIGHT: f32 = 252.0;
const PIE_SIDE: f32 = 252.0;

/// zlib level for embedded chart pixels
const DEFLATE_LEVEL: u8 = 6;

/// Sample text answers printed per question
const MAX_TEXT_SAMPLES: usize = 5;

const BLACK: [u8; 3] = [0, 0, 0];
const GREY: [u8; 3] = [100, 100, 100];
const RED: [u8; 3] = [180, 30, 30];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"F1"),
            Font::Bold => Name(b"F2"),
        }
    }
}

#[derive(Debug)]
enum Element {
    Line {
        text: String,
        size: f32,
        font: Font,
        indent: f32,
        color: [u8; 3],
    },
    Spacer(f32),
    Image {
        index: usize,
        width: f32,
        height: f32,
    },
    Row {
        cells: Vec<String>,
        widths: Vec<f32>,
        swatch: Option<[u8; 3]>,
        font: Font,
        grid: bool,
    },
}

impl Element {
    fn height(&self) -> f32 {
        match self {
            Element::Line { size, .. } => size * 1.4,
            Element::Spacer(h) => *h,
            Element::Image { height, .. } => height + 8.0,
            Element::Row { .. } => ROW_HEIGHT,
        }
    }
}

#[derive(Debug, Default)]
struct Block {
    elements: Vec<Element>,
    keep_together: bool,
}

impl Block {
    fn kept() -> Self {
        Self {
            elements: Vec::new(),
            keep_together: true,
        }
    }

    fn height(&self) -> f32 {
        self.elements.iter().map(Element::height).sum()
    }

    fn spacer(&mut self, height: f32) {
        self.elements.push(Element::Spacer(height));
    }

    /// Wrapped paragraph, one element per line
    fn paragraph(&mut self, text: &str, size: f32, font: Font, indent: f32, color: [u8; 3]) {
        for line in wrap(text, size, font, CONTENT_WIDTH - indent) {
            self.elements.push(Element::Line {
                text: line,
                size,
                font,
                indent,
                color,
            });
        }
    }

    /// Paragraph with a hanging bullet
    fn bullet(&mut self, text: &str, size: f32, max_lines: usize) {
        let indent = 18.0;
        let lines = wrap(text, size, Font::Regular, CONTENT_WIDTH - indent);
        let truncated = lines.len() > max_lines;
        for (i, line) in lines.into_iter().take(max_lines).enumerate() {
            let mut text = if i == 0 { format!("\u{2022} {}", line) } else { format!("  {}", line) };
            if truncated && i + 1 == max_lines {
                text.push_str(" ...");
            }
            self.elements.push(Element::Line {
                text,
                size,
                font: Font::Regular,
                indent: indent - 8.0,
                color: BLACK,
            });
        }
    }
}

#[derive(Debug)]
struct EmbeddedImage {
    raw: Vec<u8>,
    width: u32,
    height: u32,
}

#[derive(Debug, Default)]
struct PageLayout {
    /// Elements with the y coordinate of their top edge
    elements: Vec<(f32, Element)>,
    images: Vec<usize>,
}

/// A4 PDF report with charts, option tables and insights
#[derive(Debug, Clone, Default)]
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        Self
    }

    fn build_blocks(
        &self,
        analysis: &SurveyAnalysisResult,
        images: &mut Vec<EmbeddedImage>,
    ) -> Vec<Block> {
        let mut blocks = Vec::new();

        let mut header = Block::default();
        header.paragraph(
            &format!("Survey Analysis Report: {}", analysis.survey_title),
            18.0,
            Font::Bold,
            0.0,
            BLACK,
        );
        header.spacer(12.0);
        header.paragraph("Survey Overview", 14.0, Font::Bold, 0.0, BLACK);
        header.spacer(4.0);

        let widths = vec![CONTENT_WIDTH * 0.5, CONTENT_WIDTH * 0.5];
        let mut overview = vec![
            ("Total Responses".to_string(), analysis.total_responses.to_string()),
            (
                "Completion Rate".to_string(),
                format!("{:.1}%", analysis.completion_rate * 100.0),
            ),
        ];
        if let Some(avg) = &analysis.average_time_to_complete {
            overview.push(("Average Time to Complete".to_string(), avg.clone()));
        }
        for (label, value) in overview {
            header.elements.push(Element::Row {
                cells: vec![label, value],
                widths: widths.clone(),
                swatch: None,
                font: Font::Regular,
                grid: true,
            });
        }
        header.spacer(18.0);
        header.paragraph("Question Analysis", 14.0, Font::Bold, 0.0, BLACK);
        header.spacer(6.0);

        if analysis.questions.is_empty() {
            header.paragraph("No questions found in survey", 11.0, Font::Regular, 0.0, BLACK);
        }
        blocks.push(header);

        for (i, question) in analysis.questions.iter().enumerate() {
            blocks.push(self.question_block(i + 1, question, images));
        }

        blocks
    }

    fn question_block(
        &self,
        number: usize,
        question: &QuestionAnalysis,
        images: &mut Vec<EmbeddedImage>,
    ) -> Block {
        let summary = &question.summary;
        let mut block = Block::kept();

        block.paragraph(
            &format!("{}. {}", number, summary.question_text),
            12.0,
            Font::Bold,
            0.0,
            BLACK,
        );
        block.paragraph(
            &format!(
                "Type: {}, Responses: {}",
                summary.question_type, summary.response_count
            ),
            10.0,
            Font::Regular,
            0.0,
            GREY,
        );
        block.spacer(6.0);

        let mut legend_printed = false;
        if let Some(chart) = &question.chart_image {
            match decode_chart(chart) {
                Ok(image) => {
                    let (width, height) = if image.width == image.height {
                        (PIE_SIDE, PIE_SIDE)
                    } else {
                        (CHART_WIDTH, CHART_HEIGHT)
                    };
                    images.push(image);
                    block.elements.push(Element::Image {
                        index: images.len() - 1,
                        width,
                        height,
                    });
                }
                Err(e) => {
                    warn!(question_id = summary.question_id, "Chart not embedded: {}", e);
                    block.paragraph(
                        &format!("Error rendering chart: {}", e),
                        10.0,
                        Font::Regular,
                        0.0,
                        RED,
                    );
                }
            }

            if let Some(note) = &chart.note {
                block.paragraph(note, 10.0, Font::Regular, 0.0, GREY);
            }

            if !chart.legend.is_empty() {
                self.legend_rows(&mut block, question, chart);
                legend_printed = true;
            }
        }

        if !legend_printed {
            if let Some(counts) = summary.option_counts.as_ref().filter(|c| !c.is_empty()) {
                let widths = legend_widths();
                for count in counts {
                    block.elements.push(Element::Row {
                        cells: vec![
                            count.label.clone(),
                            count.count.to_string(),
                            format!("{:.1}%", count.percentage),
                        ],
                        widths: widths.clone(),
                        swatch: None,
                        font: Font::Regular,
                        grid: false,
                    });
                }
            }
        }

        if summary.question_type == QuestionType::Text {
            let samples = summary.text_responses.as_deref().unwrap_or_default();
            if !samples.is_empty() {
                block.spacer(4.0);
                block.paragraph("Sample Responses:", 10.0, Font::Bold, 0.0, BLACK);
                for sample in samples.iter().take(MAX_TEXT_SAMPLES) {
                    block.bullet(sample, 9.0, 3);
                }
            }
        }

        block.spacer(6.0);
        block.paragraph("Key Insights:", 11.0, Font::Bold, 0.0, BLACK);
        if question.insights.is_empty() {
            block.paragraph(
                "No specific insights available.",
                10.0,
                Font::Regular,
                0.0,
                BLACK,
            );
        } else {
            for insight in &question.insights {
                block.bullet(insight, 10.0, 6);
            }
        }
        block.spacer(20.0);

        block
    }

    fn legend_rows(&self, block: &mut Block, question: &QuestionAnalysis, chart: &ChartImage) {
        let widths = legend_widths();
        // Option charts mirror option_counts one to one; word charts do not
        let counts = question
            .summary
            .option_counts
            .as_ref()
            .filter(|c| c.len() == chart.legend.len());
        let total: u64 = chart.legend.iter().map(|e| e.value).sum();

        for (i, entry) in chart.legend.iter().enumerate() {
            let percentage = match counts {
                Some(counts) => counts[i].percentage,
                None if total > 0 => entry.value as f64 / total as f64 * 100.0,
                None => 0.0,
            };
            block.elements.push(Element::Row {
                cells: vec![
                    entry.label.clone(),
                    entry.value.to_string(),
                    format!("{:.1}%", percentage),
                ],
                widths: widths.clone(),
                swatch: Some(entry.color),
                font: Font::Regular,
                grid: false,
            });
        }
    }

    fn write_pdf(
        &self,
        analysis: &SurveyAnalysisResult,
        pages: Vec<PageLayout>,
        images: &[EmbeddedImage],
    ) -> Vec<u8> {
        let mut ids = RefAllocator::default();
        let catalog_id = ids.next();
        let tree_id = ids.next();
        let info_id = ids.next();
        let font_id = ids.next();
        let bold_id = ids.next();
        let image_ids: Vec<Ref> = images.iter().map(|_| ids.next()).collect();
        let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (ids.next(), ids.next())).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().map(|(page, _)| *page))
            .count(page_ids.len() as i32);

        let title = format!("Survey Analysis Report: {}", analysis.survey_title);
        pdf.document_info(info_id)
            .title(TextStr(&title))
            .producer(TextStr("survey-analytics"));

        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        for (image, id) in images.iter().zip(&image_ids) {
            let compressed = compress_to_vec_zlib(&image.raw, DEFLATE_LEVEL);
            let mut xobject = pdf.image_xobject(*id, &compressed);
            xobject.filter(Filter::FlateDecode);
            xobject.width(image.width as i32);
            xobject.height(image.height as i32);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            xobject.finish();
        }

        let generated = analysis.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let page_count = pages.len();

        for (number, (layout, (page_id, content_id))) in pages.iter().zip(&page_ids).enumerate() {
            let image_names: Vec<(String, Ref)> = layout
                .images
                .iter()
                .map(|i| (image_name(*i), image_ids[*i]))
                .collect();

            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
            page.parent(tree_id);
            page.contents(*content_id);
            {
                let mut resources = page.resources();
                resources
                    .fonts()
                    .pair(Font::Regular.resource(), font_id)
                    .pair(Font::Bold.resource(), bold_id);
                if !image_names.is_empty() {
                    let mut xobjects = resources.x_objects();
                    for (name, id) in &image_names {
                        xobjects.pair(Name(name.as_bytes()), *id);
                    }
                }
            }
            page.finish();

            let content = render_page(layout, number + 1, page_count, &generated);
            pdf.stream(*content_id, &content);
        }

        pdf.finish()
    }
}

impl Exporter for PdfExporter {
    fn export(&self, analysis: &SurveyAnalysisResult) -> AnalyticsResult<Vec<u8>> {
        let mut images = Vec::new();
        let blocks = self.build_blocks(analysis, &mut images);
        let pages = paginate(blocks);
        debug!(
            survey_id = analysis.survey_id,
            pages = pages.len(),
            charts = images.len(),
            "Writing PDF report"
        );
        Ok(self.write_pdf(analysis, pages, &images))
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn file_extension(&self) -> &'static str {
        "pdf"
    }
}

#[derive(Debug, Default)]
struct RefAllocator(i32);

impl RefAllocator {
    fn next(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn legend_widths() -> Vec<f32> {
    vec![CONTENT_WIDTH * 0.6, CONTENT_WIDTH * 0.2, CONTENT_WIDTH * 0.2]
}

fn decode_chart(chart: &ChartImage) -> Result<EmbeddedImage, String> {
    let bytes = B64.decode(&chart.png_base64).map_err(|e| e.to_string())?;
    let rgb = image::load_from_memory(&bytes)
        .map_err(|e| e.to_string())?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(EmbeddedImage {
        raw: rgb.into_raw(),
        width,
        height,
    })
}

/// Place blocks on pages, moving kept blocks whole when they fit a page
fn paginate(blocks: Vec<Block>) -> Vec<PageLayout> {
    let top = PAGE_HEIGHT - MARGIN;
    let bottom = MARGIN;
    let usable = top - bottom;

    let mut pages = vec![PageLayout::default()];
    let mut cursor = top;

    for block in blocks {
        let height = block.height();
        let page_empty = pages.last().is_some_and(|p| p.elements.is_empty());
        if block.keep_together && height <= usable && cursor - height < bottom && !page_empty {
            pages.push(PageLayout::default());
            cursor = top;
        }

        for element in block.elements {
            let h = element.height();
            let page_empty = pages.last().is_some_and(|p| p.elements.is_empty());
            if cursor - h < bottom && !page_empty {
                pages.push(PageLayout::default());
                cursor = top;
            }
            if matches!(element, Element::Spacer(_)) && cursor == top {
                continue;
            }

            if let Some(page) = pages.last_mut() {
                if let Element::Image { index, .. } = &element {
                    page.images.push(*index);
                }
                page.elements.push((cursor, element));
            }
            cursor -= h;
        }
    }

    pages
}

fn set_fill(content: &mut Content, color: [u8; 3]) {
    content.set_fill_rgb(
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    );
}

fn draw_text(content: &mut Content, text: &str, x: f32, y: f32, size: f32, font: Font, color: [u8; 3]) {
    set_fill(content, color);
    content.begin_text();
    content.set_font(font.resource(), size);
    content.next_line(x, y);
    content.show(Str(&encode_win_ansi(text)));
    content.end_text();
}

fn render_page(layout: &PageLayout, number: usize, count: usize, generated: &str) -> Vec<u8> {
    let mut content = Content::new();

    for (top, element) in &layout.elements {
        match element {
            Element::Line {
                text,
                size,
                font,
                indent,
                color,
            } => {
                draw_text(&mut content, text, MARGIN + indent, top - size, *size, *font, *color);
            }
            Element::Spacer(_) => {}
            Element::Image {
                index,
                width,
                height,
            } => {
                let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
                let y = top - height - 4.0;
                let name = image_name(*index);
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, x, y]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
            Element::Row {
                cells,
                widths,
                swatch,
                font,
                grid,
            } => {
                let mut x = MARGIN;
                let y = top - ROW_HEIGHT;
                for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
                    if *grid {
                        content.set_line_width(0.5);
                        content.set_stroke_rgb(0.4, 0.4, 0.4);
                        content.rect(x, y, *width, ROW_HEIGHT);
                        content.stroke();
                    }

                    let mut text_x = x + 4.0;
                    if i == 0 {
                        if let Some(color) = swatch {
                            set_fill(&mut content, *color);
                            content.rect(text_x, y + 5.5, 9.0, 9.0);
                            content.fill_nonzero();
                            text_x += 14.0;
                        }
                    }

                    let size = 10.0;
                    let available = width - (text_x - x) - 4.0;
                    let text = truncate(cell, size, *font, available);
                    draw_text(&mut content, &text, text_x, y + 6.5, size, *font, BLACK);
                    x += width;
                }
            }
        }
    }

    draw_text(
        &mut content,
        &format!("Generated: {}", generated),
        MARGIN,
        FOOTER_Y,
        8.0,
        Font::Regular,
        GREY,
    );
    let page_label = format!("Page {} of {}", number, count);
    let label_width = text_width(&page_label, 8.0, Font::Regular);
    draw_text(
        &mut content,
        &page_label,
        PAGE_WIDTH - MARGIN - label_width,
        FOOTER_Y,
        8.0,
        Font::Regular,
        GREY,
    );

    content.finish()
}

/// Approximate Helvetica advance width in em units
fn char_width(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' | '.' | ',' | ':' | ';' | '!' => 0.28,
        ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '-' => 0.33,
        'm' | 'w' | 'M' | 'W' => 0.85,
        '0'..='9' => 0.556,
        c if c.is_uppercase() => 0.68,
        _ => 0.54,
    }
}

fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let factor = if font == Font::Bold { 1.06 } else { 1.0 };
    text.chars().map(char_width).sum::<f32>() * size * factor
}

/// Greedy word wrap; words wider than a line are split
fn wrap(text: &str, size: f32, font: Font, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size, font) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        for c in word.chars() {
            current.push(c);
            if text_width(&current, size, font) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(text: &str, size: f32, font: Font, max_width: f32) -> String {
    if text_width(text, size, font) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        if text_width(&out, size, font) + text_width("...", size, font) > max_width {
            out.pop();
            break;
        }
    }
    out.push_str("...");
    out
}

/// Encode text for the WinAnsi-encoded standard fonts
///
/// Polish letters outside the code page fall back to their base letter;
/// other unsupported characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            'ą' => b'a',
            'Ą' => b'A',
            'ć' => b'c',
            'Ć' => b'C',
            'ę' => b'e',
            'Ę' => b'E',
            'ł' => b'l',
            'Ł' => b'L',
            'ń' => b'n',
            'Ń' => b'N',
            'ś' => b's',
            'Ś' => b'S',
            'ź' | 'ż' => b'z',
            'Ź' | 'Ż' => b'Z',
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}
