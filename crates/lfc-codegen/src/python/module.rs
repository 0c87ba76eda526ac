//! The Python half of a federate: reactor classes and their instances.

use lfc_config::Target;
use lfc_types::model::{ClassId, FederateInstance, InstanceId, Program, ReactorClass, ReactorTree};

use super::extension_module;
use super::reaction::is_native_class;
use crate::builder::CodeBuilder;

const HEADER: &str = r#"# List imported names, but do not use pylint's --extension-pkg-allow-list option
# so that these names will be assumed present without having to compile and install."#;

const BASE_IMPORTS: &str = r#"from LinguaFrancaBase.constants import BILLION, FOREVER, NEVER, instant_t, interval_t
from LinguaFrancaBase.functions import (
    DAY, DAYS, HOUR, HOURS, MINUTE, MINUTES, MSEC, MSECS, NSEC, NSECS, SEC, SECS, USEC,
    USECS, WEEK, WEEKS
)
from LinguaFrancaBase.classes import Make
import sys
import copy"#;

const MAIN: &str = r#"# The main function
def main(argv):
    start(argv)

# As is customary in Python programs, the main() function
# should only be executed if the main module is active.
if __name__=="__main__":
    main(sys.argv)"#;

/// Name of the module-level list holding the instances (one per bank
/// member) of `instance`. Also stored in the instance's `_lf_name`.
pub fn instance_list_name(tree: &ReactorTree, instance: InstanceId) -> String {
    format!("{}_lf", tree.full_name(instance).replace('.', "_"))
}

fn py_ident(name: &str) -> String {
    Target::Python.sanitize_identifier(name)
}

/// Leading spaces and tabs of `line`, in bytes. Other whitespace is part
/// of the body.
fn indent_width(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

/// Re-indent a user-written body so it nests at the builder's indentation.
fn dedent(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    let lines = &lines[start..end];
    let margin = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_width(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[margin..] })
        .collect::<Vec<_>>()
        .join("\n")
}

// ══════════════════════════════════════════════════════════════════════════════
// Classes
// ══════════════════════════════════════════════════════════════════════════════

fn pr_reaction_method(code: &mut CodeBuilder, name: &str, params: &[String], prelude: &[String], body: &str) {
    let mut signature = vec!["self".to_string()];
    signature.extend(params.iter().cloned());
    code.pr(format!("def {name}({}):", signature.join(", ")));
    code.indent();
    code.pr_all(prelude);
    let body = dedent(body);
    if !body.trim().is_empty() {
        code.pr(body);
    }
    code.pr("return 0");
    code.unindent();
}

/// `class _<Name>` with parameters, state and reaction methods.
pub fn generate_python_class(program: &Program, class_id: ClassId) -> String {
    let class = program.class(class_id);
    let mut code = CodeBuilder::new();
    code.pr(format!("# Python class for reactor {}", class.name));
    code.pr(format!("class _{}:", class.name));
    code.indent();

    code.pr("# Constructor");
    code.pr("def __init__(self, **kwargs):");
    code.indent();
    code.pr("# Define parameters and their default values");
    code.pr("self._bank_index = 0");
    for param in &class.parameters {
        code.pr(format!("self._{} = {}", py_ident(&param.name), param.default));
    }
    code.pr("# Handle parameters that are set in instantiation");
    code.pr("self.__dict__.update(kwargs)");
    if !class.state_vars.is_empty() {
        code.pr("# Define state variables");
    }
    for state in &class.state_vars {
        code.pr(format!(
            "self.{} = {}",
            py_ident(&state.name),
            state.init.as_deref().unwrap_or("None")
        ));
    }
    code.unindent();
    code.blank();

    for param in &class.parameters {
        let name = py_ident(&param.name);
        code.pr("@property");
        code.pr(format!("def {name}(self):"));
        code.indent();
        code.pr(format!("return self._{name} # pylint: disable=no-member"));
        code.unindent();
        code.blank();
    }

    if !is_native_class(program, class_id) {
        pr_reaction_methods(&mut code, class);
    }
    code.unindent();
    code.into_string()
}

fn pr_reaction_methods(code: &mut CodeBuilder, class: &ReactorClass) {
    for (i, reaction) in class.reactions.iter().enumerate() {
        let mut params = Vec::new();
        let mut prelude = Vec::new();
        let mut containers: Vec<&str> = Vec::new();
        for var in reaction.variables() {
            let param = py_ident(&var.to_ident());
            if let Some(container) = var.container.as_deref() {
                if !containers.contains(&container) {
                    containers.push(container);
                    prelude.push(format!("{} = Make()", py_ident(container)));
                }
                prelude.push(format!("{}.{} = {param}", py_ident(container), var.variable));
            }
            params.push(param);
        }
        pr_reaction_method(code, &format!("reaction_function_{i}"), &params, &prelude, &reaction.body);
        code.blank();
        if let Some(deadline) = &reaction.deadline {
            pr_reaction_method(code, &format!("deadline_function_{i}"), &params, &prelude, &deadline.body);
            code.blank();
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instances
// ══════════════════════════════════════════════════════════════════════════════

/// Instance lists followed by the instantiation of every Python instance
/// of `federate`, in tree order.
pub fn generate_instantiations(program: &Program, federate: &FederateInstance) -> String {
    let tree = &program.tree;
    let instances: Vec<InstanceId> = tree
        .preorder()
        .into_iter()
        .filter(|&id| federate.contains_instance(tree, id))
        .filter(|&id| !is_native_class(program, tree.get(id).class))
        .collect();

    let mut lists: Vec<(String, usize)> = Vec::new();
    for &id in &instances {
        let name = instance_list_name(tree, id);
        let size = tree.get(id).bank_index + 1;
        match lists.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = entry.1.max(size),
            None => lists.push((name, size)),
        }
    }

    let mut code = CodeBuilder::new();
    for (name, size) in &lists {
        code.pr(format!("{name} = [None] * {size}"));
    }
    for &id in &instances {
        let instance = tree.get(id);
        let class = program.class(instance.class);
        code.pr(format!(
            "# Start initializing {} of class {}",
            tree.full_name(id),
            class.name
        ));
        code.pr(format!(
            "{}[{}] = _{}(",
            instance_list_name(tree, id),
            instance.bank_index,
            class.name
        ));
        code.indent();
        code.pr(format!("_bank_index = {},", instance.bank_index));
        for param in &class.parameters {
            let value = instance
                .parameter_values
                .iter()
                .find(|(n, _)| *n == param.name)
                .map_or(param.default.as_str(), |(_, v)| v.as_str());
            code.pr(format!("_{} = {value},", py_ident(&param.name)));
        }
        code.unindent();
        code.pr(")");
    }
    code.into_string()
}

/// The complete Python module of one federate.
pub fn generate_python_module(
    program: &Program,
    federate: &FederateInstance,
    classes: &[ClassId],
    top_level_name: &str,
    preamble: &[String],
) -> String {
    let mut code = CodeBuilder::new();
    code.pr(HEADER);
    code.pr(format!(
        "from {} import (  # pylint: disable=no-name-in-module",
        extension_module(top_level_name)
    ));
    code.pr("    Tag, action_capsule_t, compare_tags, get_current_tag, get_elapsed_logical_time,");
    code.pr("    get_elapsed_physical_time, get_logical_time, get_microstep, get_physical_time,");
    code.pr("    get_start_time, port_capsule, port_instance_token, request_stop, schedule_copy,");
    code.pr("    start");
    code.pr(")");
    code.pr(BASE_IMPORTS);
    code.blank();
    for block in preamble {
        code.pr(dedent(block));
    }
    code.blank();
    for &class_id in classes {
        code.pr(generate_python_class(program, class_id));
    }
    code.blank();
    code.pr("# Instantiate classes");
    code.pr(generate_instantiations(program, federate));
    code.blank();
    code.pr(MAIN);
    code.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfc_types::model::{
        Deadline, ParameterDecl, PortDecl, Reaction, StateVarDecl, TriggerRef, VarRef,
    };
    use lfc_types::TimeValue;

    fn program() -> Program {
        let mut count = ReactorClass::new("Count");
        count.parameters.push(ParameterDecl {
            name: "stride".into(),
            default: "1".into(),
        });
        count.state_vars.push(StateVarDecl {
            name: "count".into(),
            init: Some("0".into()),
        });
        count.outputs.push(PortDecl::new("out"));
        count.reactions.push(Reaction {
            triggers: vec![TriggerRef::Startup],
            effects: vec![VarRef::local("out")],
            body: "\n    out.set(self.count)\n    self.count += self.stride\n".into(),
            ..Reaction::default()
        });
        let mut main = ReactorClass::new("Main");
        main.is_main = true;
        main.reactions.push(Reaction {
            triggers: vec![TriggerRef::Var(VarRef::contained("c", "out"))],
            body: "print(c.out.value)".into(),
            deadline: Some(Deadline {
                delay: TimeValue::msec(1),
                body: "print('late')".into(),
            }),
            ..Reaction::default()
        });
        let mut tree = ReactorTree::new("Main", ClassId(1));
        let c = tree.add_child(tree.root(), "c", ClassId(0));
        tree.get_mut(c).parameter_values.push(("stride".into(), "2".into()));
        Program {
            name: "Counter".into(),
            target: "Python".into(),
            properties: Vec::new(),
            preambles: vec!["import math".into()],
            classes: vec![count, main],
            tree,
            federates: vec![FederateInstance::singleton()],
            network_connections: Vec::new(),
        }
    }

    #[test]
    fn class_has_parameters_state_and_reactions() {
        let p = program();
        let code = generate_python_class(&p, ClassId(0));
        assert!(code.starts_with("# Python class for reactor Count\nclass _Count:\n"));
        assert!(code.contains("        self._stride = 1\n"));
        assert!(code.contains("        self.count = 0\n"));
        assert!(code.contains("    @property\n    def stride(self):\n        return self._stride # pylint: disable=no-member\n"));
        assert!(code.contains("    def reaction_function_0(self, out):\n        out.set(self.count)\n        self.count += self.stride\n        return 0\n"));
    }

    #[test]
    fn contained_ports_are_regrouped() {
        let p = program();
        let code = generate_python_class(&p, ClassId(1));
        assert!(code.contains("    def reaction_function_0(self, c_out):\n        c = Make()\n        c.out = c_out\n        print(c.out.value)\n"));
        assert!(code.contains("    def deadline_function_0(self, c_out):"));
    }

    #[test]
    fn instantiations_follow_tree_order() {
        let p = program();
        let code = generate_instantiations(&p, &p.federates[0]);
        let lines: Vec<&str> = code.lines().collect();
        assert_eq!(lines[0], "Main_lf = [None] * 1");
        assert_eq!(lines[1], "Main_c_lf = [None] * 1");
        assert!(code.contains("Main_c_lf[0] = _Count(\n    _bank_index = 0,\n    _stride = 2,\n)"));
    }

    #[test]
    fn module_layout() {
        let p = program();
        let module = generate_python_module(&p, &p.federates[0], &[ClassId(0), ClassId(1)], "Counter", &p.preambles);
        assert!(module.contains("from LinguaFrancaCounter import (  # pylint: disable=no-name-in-module"));
        let preamble = module.find("import math").unwrap();
        let classes = module.find("class _Count:").unwrap();
        let instances = module.find("# Instantiate classes").unwrap();
        let main = module.find("def main(argv):").unwrap();
        assert!(preamble < classes && classes < instances && instances < main);
        assert!(module.ends_with("    main(sys.argv)\n"));
    }

    #[test]
    fn dedent_keeps_non_ascii_whitespace() {
        assert_eq!(dedent("\u{a0}out.set(1)\n out.set(2)"), "\u{a0}out.set(1)\n out.set(2)");
        assert_eq!(dedent("\n    a\n      b\n"), "a\n  b");
        assert_eq!(dedent("\t\u{3000}x\n\ty"), "\u{3000}x\ny");
    }

    #[test]
    fn unicode_indented_body_generates() {
        let mut p = program();
        p.classes[0].reactions[0].body = "\u{a0}out.set(1)\n out.set(2)".into();
        let code = generate_python_class(&p, ClassId(0));
        assert!(code.contains("        \u{a0}out.set(1)\n         out.set(2)\n"));
    }

    #[test]
    fn reserved_words_are_sanitized() {
        let mut p = program();
        p.classes[0].parameters[0].name = "lambda".into();
        let code = generate_python_class(&p, ClassId(0));
        assert!(code.contains("self._lambda_ = 1"));
    }
}
