//! Flashcard prompt template and the parser for model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// System instruction sent ahead of every user prompt: the card format
/// plus two worked examples (a term list, and a bare topic).
pub const SYSTEM_INSTRUCTION: &str = r#"You are a flashcard generator. The user sends a prompt that names the topic or the titles of the flashcards. For each prompt, produce concise definitions in the format of typical flashcards: a numbered list where every entry is "N. **Term**: definition". Generate 10 different cards unless the prompt asks for another number. Output only the list, with no preamble such as "Sure!". Math formulas are rendered with KaTeX, so write them in KaTeX syntax.

Example 1
Input:
"1. Derivative
2. Integral
3. Chain Rule
4. Product Rule
5. Quotient Rule
6. Fundamental Theorem of Calculus"

Output:
"1. **Derivative**: The rate of change of a function with respect to a variable; the slope of the tangent line to its curve. Formula: $$ f'(x) = \lim_{h \to 0} \frac{f(x+h) - f(x)}{h} $$

2. **Integral**: The accumulation of a quantity; the area under the curve of a function. Formula: $$ \int_a^b f(x) \, dx $$

3. **Chain Rule**: Computes the derivative of a composite function. Formula: $$ \frac{dy}{dx} = \frac{dy}{du} \cdot \frac{du}{dx} $$

4. **Product Rule**: Computes the derivative of a product of two functions. Formula: $$ \frac{d}{dx}(uv) = u'v + uv' $$

5. **Quotient Rule**: Computes the derivative of a quotient of two functions. Formula: $$ \frac{d}{dx}\left(\frac{u}{v}\right) = \frac{u'v - uv'}{v^2} $$

6. **Fundamental Theorem of Calculus**: Links differentiation with integration. If \( F(x) \) is an antiderivative of \( f(x) \), then: $$ \int_a^b f(x) \, dx = F(b) - F(a) $$"

Example 2
Input:
"Calculus 1 concepts"

Output:
"1. **Derivative**: The rate of change of a function with respect to a variable. Formula: $$ f'(x) = \lim_{h \to 0} \frac{f(x+h) - f(x)}{h} $$

2. **Integral**: The accumulation of a quantity; the area under a curve. Formula: $$ \int_a^b f(x) \, dx $$

3. **Chain Rule**: Computes the derivative of a composite function. Formula: $$ \frac{dy}{dx} = \frac{dy}{du} \cdot \frac{du}{dx} $$

4. **Product Rule**: Computes the derivative of a product. Formula: $$ \frac{d}{dx}(uv) = u'v + uv' $$

5. **Quotient Rule**: Computes the derivative of a quotient. Formula: $$ \frac{d}{dx}\left(\frac{u}{v}\right) = \frac{u'v - uv'}{v^2} $$

6. **Fundamental Theorem of Calculus**: Links differentiation with integration. Formula: $$ \int_a^b f(x) \, dx = F(b) - F(a) $$

7. **Limits**: The value a function approaches as its input approaches a point; the basis of derivatives and integrals. Formula: $$ \lim_{x \to a} f(x) = L $$

8. **Continuity**: A function is continuous at a point when its limit there equals its value. Formula: \( \lim_{x \to c} f(x) = f(c) \)

9. **Taylor Series**: A function written as an infinite sum of terms built from its derivatives at one point. Formula: $$ f(x) = f(a) + f'(a)(x-a) + \frac{f''(a)}{2!}(x-a)^2 + \dots $$

10. **L'Hôpital's Rule**: Evaluates indeterminate limits such as \( \frac{0}{0} \) by differentiating numerator and denominator. Formula: $$ \lim_{x \to c} \frac{f(x)}{g(x)} = \lim_{x \to c} \frac{f'(x)}{g'(x)} $$""#;

// A list marker flush at the start of a line: digits, period, whitespace.
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\.\s").expect("list marker regex"));

/// Split numbered-list model output into cards, renumbered from 1.
///
/// Each fragment between list markers becomes `"{n}. {fragment}"` with the
/// fragment trimmed; blank fragments are dropped. Text before the first
/// marker counts as a card of its own. Badly numbered output yields fewer
/// or merged cards, never an error.
pub fn parse_flashcards(raw: &str) -> Vec<String> {
    LIST_MARKER
        .split(raw)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .enumerate()
        .map(|(i, fragment)| format!("{}. {}", i + 1, fragment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_list() {
        assert_eq!(parse_flashcards("1. A\n2. B\n3. C"), vec!["1. A", "2. B", "3. C"]);
    }

    #[test]
    fn test_irregular_spacing_is_trimmed() {
        assert_eq!(parse_flashcards("\n1.  A \n2. B"), vec!["1. A", "2. B"]);
    }

    #[test]
    fn test_blank_lines_between_cards() {
        let raw = "1. **Derivative**: slope\n\n2. **Integral**: area\n\n3. **Limit**: approach";
        assert_eq!(
            parse_flashcards(raw),
            vec![
                "1. **Derivative**: slope",
                "2. **Integral**: area",
                "3. **Limit**: approach",
            ]
        );
    }

    #[test]
    fn test_indented_sub_list_stays_inside_its_card() {
        let raw = "1. **Algorithm**: steps are\n   1. read input\n   2. write output\n2. **Loop**: repetition";
        assert_eq!(
            parse_flashcards(raw),
            vec![
                "1. **Algorithm**: steps are\n   1. read input\n   2. write output",
                "2. **Loop**: repetition",
            ]
        );
    }

    #[test]
    fn test_survivors_are_renumbered() {
        assert_eq!(parse_flashcards("4. X\n9. Y\n\n12. Z"), vec!["1. X", "2. Y", "3. Z"]);
    }

    #[test]
    fn test_decimals_inside_a_card_do_not_split() {
        assert_eq!(
            parse_flashcards("1. **Pi**: about 3.14 or\n3.14159 precisely\n2. **e**: 2.718"),
            vec!["1. **Pi**: about 3.14 or\n3.14159 precisely", "2. **e**: 2.718"]
        );
    }

    #[test]
    fn test_unnumbered_preamble_becomes_first_card() {
        assert_eq!(parse_flashcards("Sure!\n1. A\n2. B"), vec!["1. Sure!", "2. A", "3. B"]);
    }

    #[test]
    fn test_missing_numbers_merge_cards() {
        assert_eq!(parse_flashcards("1. A\nB\n2. C"), vec!["1. A\nB", "2. C"]);
    }

    #[test]
    fn test_empty_and_marker_only_input() {
        assert!(parse_flashcards("").is_empty());
        assert!(parse_flashcards("   \n1. \n2. ").is_empty());
    }
}
