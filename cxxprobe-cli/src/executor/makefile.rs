//! Makefile emission for generated benchmark projects

use anyhow::bail;

fn object_name(source: &str) -> String {
    format!("{}.o", source.trim_end_matches(".cpp"))
}

fn dependency_name(source: &str) -> String {
    format!("{}.d", source.trim_end_matches(".cpp"))
}

/// Emit a Makefile building `executable` from `sources`.
///
/// Every source gets a `-MMD -MP` compile rule so header changes trigger
/// rebuilds; `<executable>.cpp` must be one of the sources.
pub fn emit_makefile(
    sources: &[String],
    executable: &str,
    compile_command: &str,
    link_command: &str,
    link_suffix: &str,
) -> anyhow::Result<String> {
    let main_source = format!("{}.cpp", executable);
    if !sources.contains(&main_source) {
        bail!("{} must be one of the Makefile sources", main_source);
    }

    let objects: Vec<String> = sources.iter().map(|s| object_name(s)).collect();
    let dependencies: Vec<String> = sources.iter().map(|s| dependency_name(s)).collect();

    let mut out = format!(".PHONY: all clean\n\nall: {}\n\n", executable);
    out.push_str(&format!(
        "clean:\n\trm -f {} {} {}\n\n",
        executable,
        objects.join(" "),
        dependencies.join(" ")
    ));
    for ((source, object), dependency) in sources.iter().zip(&objects).zip(&dependencies) {
        out.push_str(&format!(
            "{object}: {source}\n\t{compile_command} -c {source} -o {object} -MMD -MP\n\n-include {dependency}\n\n"
        ));
    }
    out.push_str(&format!(
        "{}: {}\n\t{} {} -o {} {}\n",
        executable,
        objects.join(" "),
        link_command,
        objects.join(" "),
        executable,
        link_suffix
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_for_every_source() {
        let sources = vec!["component0.cpp".to_string(), "main.cpp".to_string()];
        let makefile = emit_makefile(&sources, "main", "g++ -O2", "g++", "-lfruit").unwrap();
        assert!(makefile.contains("all: main\n"));
        assert!(makefile.contains(
            "component0.o: component0.cpp\n\tg++ -O2 -c component0.cpp -o component0.o -MMD -MP\n"
        ));
        assert!(makefile.contains("-include main.d\n"));
        assert!(makefile.contains("main: component0.o main.o\n\tg++ component0.o main.o -o main -lfruit"));
        assert!(makefile.contains("\trm -f main component0.o main.o component0.d main.d\n"));
    }

    #[test]
    fn test_single_source_layout() {
        let sources = vec!["main.cpp".to_string()];
        let makefile = emit_makefile(&sources, "main", "g++", "g++", "-lfruit").unwrap();
        assert_eq!(
            makefile,
            ".PHONY: all clean\n\nall: main\n\nclean:\n\trm -f main main.o main.d\n\n\
             main.o: main.cpp\n\tg++ -c main.cpp -o main.o -MMD -MP\n\n-include main.d\n\n\
             main: main.o\n\tg++ main.o -o main -lfruit\n"
        );
    }

    #[test]
    fn test_requires_main_source() {
        let sources = vec!["component0.cpp".to_string()];
        assert!(emit_makefile(&sources, "main", "g++", "g++", "").is_err());
    }
}
