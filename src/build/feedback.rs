use colored::*;

pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    /// Suggest a fix for a failed toolchain step, based on its output.
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Not a CMake project at all
        if output.contains("does not appear to contain CMakeLists.txt") {
            return Some(format!(
                "No {} found in the working directory.\nRun from the project root or pass {}.",
                "CMakeLists.txt".bold().yellow(),
                "--cd <path>".bold().green()
            ));
        }

        // 2. Generator mismatch with an existing cache
        if output.contains("Does not match the generator used previously") {
            return Some(format!(
                "The build directory was configured with a different {}.\nRun {} and build again.",
                "generator".bold().red(),
                "actionman clean".bold().green()
            ));
        }

        // 3. find_package failure
        if output.contains("Could not find a package configuration file")
            || output.contains("Could NOT find")
        {
            return Some(format!(
                "A {} required by CMakeLists.txt is not installed.\nInstall it or point {} at it.",
                "package".bold().red(),
                "-DCMAKE_PREFIX_PATH=<dir>".bold().yellow()
            ));
        }

        // 4. Missing header (compiler error)
        if output.contains("fatal error: ") && output.contains("No such file or directory")
            || output.contains("cannot open include file")
        {
            return Some(format!(
                "It looks like a {} error.\nCheck {} and the include directories of the target.",
                "Missing Header".bold().red(),
                "target_include_directories".bold().yellow()
            ));
        }

        // 5. Linker error
        if output.contains("LNK2019") || output.contains("undefined reference to") {
            return Some(format!(
                "It looks like a {} error.\nYou might be missing a library in {}.",
                "Linker".bold().red(),
                "target_link_libraries".bold().yellow()
            ));
        }

        None
    }
}
