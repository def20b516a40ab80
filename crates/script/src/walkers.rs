//! PowerShell renderings of tree searches.
//!
//! Every function returns a statement list whose output stream is the found
//! elements. Bases are evaluated completely before the search's own variables
//! are assigned, so renderings nest inside each other without clobbering.
//!
//! Scopes without a native `TreeScope` member walk parent/sibling links with a
//! `TreeWalker` over the session's pushed cache-request filter and test each
//! candidate with `FindFirst([TreeScope]::Element, $condition)`. Walks never
//! leave `$rootElement`.

use crate::element::FindMode;
use crate::scope::TreeScope;

pub(crate) fn render(base: &str, scope: TreeScope, condition: &str, mode: FindMode) -> String {
    let first = mode == FindMode::First;
    if let Some(native) = scope.native() {
        return native_search(base, native, condition, first);
    }
    let body = match scope {
        TreeScope::ChildrenOrSelf => return children_or_self(base, condition, first),
        TreeScope::Parent => parent(),
        TreeScope::Ancestors => ancestors(false, first),
        TreeScope::AncestorsOrSelf => ancestors(true, first),
        TreeScope::FollowingSibling => siblings("GetNextSibling", first),
        TreeScope::PrecedingSibling => siblings("GetPreviousSibling", first),
        TreeScope::Following => following(first),
        TreeScope::Preceding => preceding(first),
        TreeScope::Element | TreeScope::Children | TreeScope::Descendants | TreeScope::Subtree => {
            unreachable!("native scopes are rendered above")
        }
    };
    format!(
        "$bases = @(\n{base}\n)\n\
         $condition = {condition}\n\
         $walker = [TreeWalker]::new($cacheRequest.TreeFilter)\n\
         foreach ($base in $bases) {{\n\
         \x20   if ($null -eq $base) {{ continue }}\n\
         {body}\
         }}"
    )
}

fn native_search(base: &str, scope: &str, condition: &str, first: bool) -> String {
    let call = if first {
        format!(
            "    $found = $base.FindFirst({scope}, $condition)\n    if ($null -ne $found) {{ $found }}\n"
        )
    } else {
        format!("    $base.FindAll({scope}, $condition)\n")
    };
    format!(
        "$bases = @(\n{base}\n)\n\
         $condition = {condition}\n\
         foreach ($base in $bases) {{\n\
         \x20   if ($null -eq $base) {{ continue }}\n\
         {call}\
         }}"
    )
}

fn children_or_self(base: &str, condition: &str, first: bool) -> String {
    let children = if first {
        "    if ($null -eq $self) {\n\
         \x20       $found = $base.FindFirst([TreeScope]::Children, $condition)\n\
         \x20       if ($null -ne $found) { $found }\n\
         \x20   }\n"
    } else {
        "    $base.FindAll([TreeScope]::Children, $condition)\n"
    };
    format!(
        "$bases = @(\n{base}\n)\n\
         $condition = {condition}\n\
         foreach ($base in $bases) {{\n\
         \x20   if ($null -eq $base) {{ continue }}\n\
         \x20   $self = $base.FindFirst([TreeScope]::Element, $condition)\n\
         \x20   if ($null -ne $self) {{ $self }}\n\
         {children}\
         }}"
    )
}

fn parent() -> String {
    "    if ([Automation]::Compare($base, $rootElement)) { continue }\n\
     \x20   $parent = $walker.GetParent($base)\n\
     \x20   if ($null -ne $parent -and $null -ne $parent.FindFirst([TreeScope]::Element, $condition)) { $parent }\n"
        .to_owned()
}

fn ancestors(include_self: bool, first: bool) -> String {
    let start = if include_self {
        "$base"
    } else {
        "if ([Automation]::Compare($base, $rootElement)) { $null } else { $walker.GetParent($base) }"
    };
    let stop = if first { "            break\n" } else { "" };
    format!(
        "    $current = {start}\n\
         \x20   while ($null -ne $current) {{\n\
         \x20       if ($null -ne $current.FindFirst([TreeScope]::Element, $condition)) {{\n\
         \x20           $current\n\
         {stop}\
         \x20       }}\n\
         \x20       if ([Automation]::Compare($current, $rootElement)) {{ break }}\n\
         \x20       $current = $walker.GetParent($current)\n\
         \x20   }}\n"
    )
}

fn siblings(step: &str, first: bool) -> String {
    let stop = if first { "            break\n" } else { "" };
    format!(
        "    if ([Automation]::Compare($base, $rootElement)) {{ continue }}\n\
         \x20   $current = $walker.{step}($base)\n\
         \x20   while ($null -ne $current) {{\n\
         \x20       if ($null -ne $current.FindFirst([TreeScope]::Element, $condition)) {{\n\
         \x20           $current\n\
         {stop}\
         \x20       }}\n\
         \x20       $current = $walker.{step}($current)\n\
         \x20   }}\n"
    )
}

fn following(first: bool) -> String {
    let emit = if first {
        "            $found = $sibling.FindFirst([TreeScope]::Subtree, $condition)\n\
         \x20           if ($null -ne $found) { $found; break walk }\n"
    } else {
        "            $sibling.FindAll([TreeScope]::Subtree, $condition)\n"
    };
    format!(
        "    $node = $base\n\
         \x20   :walk while ($null -ne $node -and -not [Automation]::Compare($node, $rootElement)) {{\n\
         \x20       $sibling = $walker.GetNextSibling($node)\n\
         \x20       while ($null -ne $sibling) {{\n\
         {emit}\
         \x20           $sibling = $walker.GetNextSibling($sibling)\n\
         \x20       }}\n\
         \x20       $node = $walker.GetParent($node)\n\
         \x20   }}\n"
    )
}

/// Nearest-first: previous siblings from the closest outwards, each subtree in
/// reverse document order, then the same one level up.
fn preceding(first: bool) -> String {
    let stop = if first { "                break walk\n" } else { "" };
    format!(
        "    $node = $base\n\
         \x20   :walk while ($null -ne $node -and -not [Automation]::Compare($node, $rootElement)) {{\n\
         \x20       $sibling = $walker.GetPreviousSibling($node)\n\
         \x20       while ($null -ne $sibling) {{\n\
         \x20           $found = @($sibling.FindAll([TreeScope]::Subtree, $condition))\n\
         \x20           for ($i = $found.Count - 1; $i -ge 0; $i--) {{\n\
         \x20               $found[$i]\n\
         {stop}\
         \x20           }}\n\
         \x20           $sibling = $walker.GetPreviousSibling($sibling)\n\
         \x20       }}\n\
         \x20       $node = $walker.GetParent($node)\n\
         \x20   }}\n"
    )
}
