use std::fmt::Write as _;

use htmlize::{escape_attribute, escape_text};
use visual_suite_types::ComparisonResult;

pub(crate) const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<visual-suite-result>\n";
pub(crate) const FOOTER: &str = "</visual-suite-result>\n";

/// Renders the `<test>` element of one compared sample.
pub(crate) fn test_record(name: &str, result: &ComparisonResult) -> String {
    let id = escape_attribute(name);
    let verdict = if result.equal_images { "same" } else { "different" };
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "    <test id=\"{id}\">");
    let _ = writeln!(out, "        <pattern id=\"{id}\" result=\"{verdict}\">");
    if result.equal_images {
        let _ = writeln!(out, "            <output/>");
    } else {
        let _ = writeln!(out, "            <output>{}</output>", escape_text(name));
    }
    write_perception(&mut out, result);
    let _ = writeln!(out, "        </pattern>");
    let _ = writeln!(out, "    </test>");
    out
}

fn write_perception(out: &mut String, r: &ComparisonResult) {
    let min = r.rectangle.min;
    let max = r.rectangle.max;
    let _ = writeln!(out, "            <perception>");
    let _ = writeln!(
        out,
        "                <area width=\"{}\" height=\"{}\" />",
        r.area.width, r.area.height
    );
    let _ = writeln!(out, "                <rectangle>");
    let _ = writeln!(out, "                    <vertex x=\"{}\" y=\"{}\" />", min.x, min.y);
    let _ = writeln!(out, "                    <vertex x=\"{}\" y=\"{}\" />", max.x, max.y);
    let _ = writeln!(out, "                </rectangle>");
    let counts = [
        ("totalPixels", r.total_pixels),
        ("maskedPixels", r.masked_pixels),
        ("perceptibleDifferentPixels", r.perceptible_different_pixels),
        ("globalDifferentPixels", r.global_different_pixels),
        ("unperceptibleDifferentPixels", r.small_different_pixels),
        ("samePixels", r.equal_pixels),
    ];
    for (tag, value) in counts {
        let _ = writeln!(out, "                <{tag}>{value}</{tag}>");
    }
    let _ = writeln!(out, "            </perception>");
}

#[cfg(test)]
mod tests {
    use visual_suite_types::{Area, Point, Rectangle};

    use super::*;

    #[test]
    fn same_record_has_empty_output() {
        let record = test_record("login", &ComparisonResult::identical(Area::new(3, 2)));
        let expected = "\
    <test id=\"login\">
        <pattern id=\"login\" result=\"same\">
            <output/>
            <perception>
                <area width=\"3\" height=\"2\" />
                <rectangle>
                    <vertex x=\"0\" y=\"0\" />
                    <vertex x=\"0\" y=\"0\" />
                </rectangle>
                <totalPixels>6</totalPixels>
                <maskedPixels>0</maskedPixels>
                <perceptibleDifferentPixels>0</perceptibleDifferentPixels>
                <globalDifferentPixels>0</globalDifferentPixels>
                <unperceptibleDifferentPixels>0</unperceptibleDifferentPixels>
                <samePixels>6</samePixels>
            </perception>
        </pattern>
    </test>
";
        assert_eq!(record, expected);
    }

    #[test]
    fn different_record_names_output_and_rectangle() {
        let mut result = ComparisonResult::identical(Area::new(10, 10));
        result.equal_images = false;
        result.rectangle = Rectangle::new(Point::new(2, 3), Point::new(7, 9));
        result.global_different_pixels = 5;
        let record = test_record("a&b", &result);
        assert!(record.contains("<test id=\"a&amp;b\">"));
        assert!(record.contains("result=\"different\""));
        assert!(record.contains("<output>a&amp;b</output>"));
        assert!(record.contains("<vertex x=\"2\" y=\"3\" />"));
        assert!(record.contains("<vertex x=\"7\" y=\"9\" />"));
        assert!(record.contains("<globalDifferentPixels>5</globalDifferentPixels>"));
    }
}
