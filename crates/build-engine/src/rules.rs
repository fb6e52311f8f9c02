//! Rule names for `flutter assemble`.
//!
//! ABIs are selected through the rule name rather than a platform flag, so
//! one build cache can hold several ABI outputs side by side. The names are
//! cache keys on the flutter side and must not change shape.

use crate::config::BuildMode;

/// Single rule used by every debug build.
pub const DEBUG_RULE: &str = "debug_android_application";

/// Ordered rule names to request for the given mode and platforms.
pub fn resolve_rules<S: AsRef<str>>(
    build_mode: BuildMode,
    deferred_components: bool,
    target_platforms: &[S],
) -> Vec<String> {
    if build_mode.is_debug() {
        return vec![DEBUG_RULE.to_string()];
    }

    let prefix = if deferred_components {
        "android_aot_deferred_components_bundle"
    } else {
        "android_aot_bundle"
    };

    target_platforms
        .iter()
        .map(|platform| format!("{}_{}_{}", prefix, build_mode, platform.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_ignores_platforms_and_deferred() {
        for deferred in [false, true] {
            assert_eq!(
                resolve_rules(BuildMode::Debug, deferred, &["android-arm", "android-x64"]),
                vec![DEBUG_RULE]
            );
        }
        assert_eq!(resolve_rules::<&str>(BuildMode::Debug, false, &[]), vec![DEBUG_RULE]);
    }

    #[test]
    fn test_aot_bundle_rules_keep_order() {
        assert_eq!(
            resolve_rules(BuildMode::Release, false, &["android-arm64", "android-arm"]),
            vec![
                "android_aot_bundle_release_android-arm64",
                "android_aot_bundle_release_android-arm",
            ]
        );
        assert_eq!(
            resolve_rules(BuildMode::Profile, false, &["x86"]),
            vec!["android_aot_bundle_profile_x86"]
        );
    }

    #[test]
    fn test_deferred_components_prefix() {
        assert_eq!(
            resolve_rules(BuildMode::Release, true, &["p1", "p2"]),
            vec![
                "android_aot_deferred_components_bundle_release_p1",
                "android_aot_deferred_components_bundle_release_p2",
            ]
        );
    }
}
