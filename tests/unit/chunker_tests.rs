/*!
 * Tests for chunk splitting on realistic documents
 */

use vitranslate::translation::{ChunkPolicy, Chunker};

use crate::common;

fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_paragraph_withArticle_shouldKeepEveryLineOnceInOrder() {
    let article = common::sample_article();

    for max_chars in [1, 40, 80, 200, 1500] {
        let chunks = Chunker::new(max_chars, ChunkPolicy::Paragraph).chunk(&article);
        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|chunk| chunk.text.lines().map(str::to_string).collect::<Vec<_>>())
            .collect();
        assert_eq!(rebuilt, non_blank_lines(&article), "max_chars = {}", max_chars);
    }
}

#[test]
fn test_paragraph_withArticle_shouldStayUnderBudgetUnlessSingleLine() {
    let article = common::sample_article();
    let chunker = Chunker::new(80, ChunkPolicy::Paragraph);

    for chunk in chunker.chunk(&article) {
        assert!(chunk.text.ends_with('\n'));
        let line_count = chunk.text.lines().count();
        assert!(chunk.char_len < 80 || line_count == 1, "chunk {:?}", chunk);
    }
}

#[test]
fn test_paragraph_withDefaultBudget_shouldReturnSingleChunk() {
    let chunks = Chunker::new(1500, ChunkPolicy::Paragraph).chunk(&common::sample_article());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text.lines().count(), 5);
}

#[test]
fn test_paragraph_withCrlfInput_shouldMatchLfInput() {
    let lf = common::sample_article();
    let crlf = lf.replace('\n', "\r\n");
    let chunker = Chunker::new(60, ChunkPolicy::Paragraph);
    assert_eq!(chunker.chunk(&lf), chunker.chunk(&crlf));
}

#[test]
fn test_paragraph_withWhitespaceOnlyInput_shouldReturnNothing() {
    let chunker = Chunker::new(10, ChunkPolicy::Paragraph);
    assert!(chunker.chunk("  \n\t\n\r\n").is_empty());
}

#[test]
fn test_chunk_shouldBeDeterministic() {
    let (text, _) = common::numbered_paragraphs(25);
    for policy in [ChunkPolicy::Paragraph, ChunkPolicy::Word] {
        let chunker = Chunker::new(64, policy);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }
}

#[test]
fn test_word_withArticle_shouldKeepEveryWordOnceInOrder() {
    let article = common::sample_article();
    let chunks = Chunker::new(25, ChunkPolicy::Word).chunk(&article);

    let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.text.split(' ')).collect();
    let expected: Vec<&str> = article.split_whitespace().collect();
    assert_eq!(rebuilt, expected);
    assert!(chunks.iter().all(|c| !c.text.contains('\n')));
}

#[test]
fn test_numbered_paragraphs_atFortyChars_shouldBeOneChunkEach() {
    let (text, lines) = common::numbered_paragraphs(12);
    let chunks = Chunker::new(40, ChunkPolicy::Paragraph).chunk(&text);

    assert_eq!(chunks.len(), lines.len());
    for (chunk, line) in chunks.iter().zip(&lines) {
        assert_eq!(chunk.text, format!("{}\n", line));
    }
}
