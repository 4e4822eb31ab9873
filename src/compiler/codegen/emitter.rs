use std::fmt;

/// A Jasmin assembly opcode. Each opcode carries its intrinsic operand
/// stack effect, applied automatically when it is emitted. Instructions
/// whose real effect depends on their operands (calls, array stores)
/// get an intrinsic effect of zero or their fixed part, and the call
/// site applies the remainder by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    IconstM1,
    Iconst0,
    Iconst1,
    Iconst2,
    Iconst3,
    Iconst4,
    Iconst5,
    Fconst0,
    Fconst1,
    Fconst2,
    Bipush,
    Sipush,
    Ldc,
    Iload,
    Iload0,
    Iload1,
    Iload2,
    Iload3,
    Fload,
    Fload0,
    Fload1,
    Fload2,
    Fload3,
    Aload,
    Aload0,
    Aload1,
    Aload2,
    Aload3,
    Lload3,
    Istore,
    Istore0,
    Istore1,
    Istore2,
    Istore3,
    Fstore,
    Fstore0,
    Fstore1,
    Fstore2,
    Fstore3,
    Astore,
    Astore0,
    Astore1,
    Astore2,
    Astore3,
    Lstore3,
    Pop,
    Dup,
    DupX1,
    Swap,
    Getstatic,
    Putstatic,
    New,
    Anewarray,
    Aastore,
    Invokestatic,
    Invokevirtual,
    Invokespecial,
    Goto,
    Ifeq,
    Ifne,
    Iflt,
    Ifle,
    Ifgt,
    Ifge,
    Fcmpg,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Fneg,
    F2i,
    Ior,
    Iand,
    Ixor,
    Return,
    Freturn,
    Ireturn,
    Areturn,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::IconstM1 => "iconst_m1",
            Opcode::Iconst0 => "iconst_0",
            Opcode::Iconst1 => "iconst_1",
            Opcode::Iconst2 => "iconst_2",
            Opcode::Iconst3 => "iconst_3",
            Opcode::Iconst4 => "iconst_4",
            Opcode::Iconst5 => "iconst_5",
            Opcode::Fconst0 => "fconst_0",
            Opcode::Fconst1 => "fconst_1",
            Opcode::Fconst2 => "fconst_2",
            Opcode::Bipush => "bipush",
            Opcode::Sipush => "sipush",
            Opcode::Ldc => "ldc",
            Opcode::Iload => "iload",
            Opcode::Iload0 => "iload_0",
            Opcode::Iload1 => "iload_1",
            Opcode::Iload2 => "iload_2",
            Opcode::Iload3 => "iload_3",
            Opcode::Fload => "fload",
            Opcode::Fload0 => "fload_0",
            Opcode::Fload1 => "fload_1",
            Opcode::Fload2 => "fload_2",
            Opcode::Fload3 => "fload_3",
            Opcode::Aload => "aload",
            Opcode::Aload0 => "aload_0",
            Opcode::Aload1 => "aload_1",
            Opcode::Aload2 => "aload_2",
            Opcode::Aload3 => "aload_3",
            Opcode::Lload3 => "lload_3",
            Opcode::Istore => "istore",
            Opcode::Istore0 => "istore_0",
            Opcode::Istore1 => "istore_1",
            Opcode::Istore2 => "istore_2",
            Opcode::Istore3 => "istore_3",
            Opcode::Fstore => "fstore",
            Opcode::Fstore0 => "fstore_0",
            Opcode::Fstore1 => "fstore_1",
            Opcode::Fstore2 => "fstore_2",
            Opcode::Fstore3 => "fstore_3",
            Opcode::Astore => "astore",
            Opcode::Astore0 => "astore_0",
            Opcode::Astore1 => "astore_1",
            Opcode::Astore2 => "astore_2",
            Opcode::Astore3 => "astore_3",
            Opcode::Lstore3 => "lstore_3",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::DupX1 => "dup_x1",
            Opcode::Swap => "swap",
            Opcode::Getstatic => "getstatic",
            Opcode::Putstatic => "putstatic",
            Opcode::New => "new",
            Opcode::Anewarray => "anewarray",
            Opcode::Aastore => "aastore",
            Opcode::Invokestatic => "invokestatic",
            Opcode::Invokevirtual => "invokevirtual",
            Opcode::Invokespecial => "invokespecial",
            Opcode::Goto => "goto",
            Opcode::Ifeq => "ifeq",
            Opcode::Ifne => "ifne",
            Opcode::Iflt => "iflt",
            Opcode::Ifle => "ifle",
            Opcode::Ifgt => "ifgt",
            Opcode::Ifge => "ifge",
            Opcode::Fcmpg => "fcmpg",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Fneg => "fneg",
            Opcode::F2i => "f2i",
            Opcode::Ior => "ior",
            Opcode::Iand => "iand",
            Opcode::Ixor => "ixor",
            Opcode::Return => "return",
            Opcode::Freturn => "freturn",
            Opcode::Ireturn => "ireturn",
            Opcode::Areturn => "areturn",
        }
    }

    /// Intrinsic operand stack delta.
    pub fn stack_use(&self) -> i32 {
        match self {
            Opcode::IconstM1
            | Opcode::Iconst0
            | Opcode::Iconst1
            | Opcode::Iconst2
            | Opcode::Iconst3
            | Opcode::Iconst4
            | Opcode::Iconst5
            | Opcode::Fconst0
            | Opcode::Fconst1
            | Opcode::Fconst2
            | Opcode::Bipush
            | Opcode::Sipush
            | Opcode::Ldc
            | Opcode::Iload
            | Opcode::Iload0
            | Opcode::Iload1
            | Opcode::Iload2
            | Opcode::Iload3
            | Opcode::Fload
            | Opcode::Fload0
            | Opcode::Fload1
            | Opcode::Fload2
            | Opcode::Fload3
            | Opcode::Aload
            | Opcode::Aload0
            | Opcode::Aload1
            | Opcode::Aload2
            | Opcode::Aload3
            | Opcode::Getstatic
            | Opcode::New
            | Opcode::Dup
            | Opcode::DupX1 => 1,
            Opcode::Lload3 => 2,
            Opcode::Istore
            | Opcode::Istore0
            | Opcode::Istore1
            | Opcode::Istore2
            | Opcode::Istore3
            | Opcode::Fstore
            | Opcode::Fstore0
            | Opcode::Fstore1
            | Opcode::Fstore2
            | Opcode::Fstore3
            | Opcode::Astore
            | Opcode::Astore0
            | Opcode::Astore1
            | Opcode::Astore2
            | Opcode::Astore3
            | Opcode::Pop
            | Opcode::Putstatic
            | Opcode::Ifeq
            | Opcode::Ifne
            | Opcode::Iflt
            | Opcode::Ifle
            | Opcode::Ifgt
            | Opcode::Ifge
            | Opcode::Fcmpg
            | Opcode::Fadd
            | Opcode::Fsub
            | Opcode::Fmul
            | Opcode::Fdiv
            | Opcode::Ior
            | Opcode::Iand
            | Opcode::Ixor
            | Opcode::Freturn
            | Opcode::Ireturn
            | Opcode::Areturn => -1,
            Opcode::Lstore3 => -2,
            Opcode::Aastore => -3,
            Opcode::Swap
            | Opcode::Anewarray
            | Opcode::Invokestatic
            | Opcode::Invokevirtual
            | Opcode::Invokespecial
            | Opcode::Goto
            | Opcode::Fneg
            | Opcode::F2i
            | Opcode::Return => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A Jasmin assembler directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    ClassPublic,
    Super,
    FieldPrivateStatic,
    MethodStatic,
    MethodPublic,
    MethodPublicStatic,
    MethodPrivateStatic,
    Var,
    LimitLocals,
    LimitStack,
    EndMethod,
}

impl Directive {
    fn text(&self) -> &'static str {
        match self {
            Directive::ClassPublic => ".class public",
            Directive::Super => ".super",
            Directive::FieldPrivateStatic => ".field private static",
            Directive::MethodStatic => ".method static",
            Directive::MethodPublic => ".method public",
            Directive::MethodPublicStatic => ".method public static",
            Directive::MethodPrivateStatic => ".method private static",
            Directive::Var => ".var",
            Directive::LimitLocals => ".limit locals",
            Directive::LimitStack => ".limit stack",
            Directive::EndMethod => ".end method",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A branch target. Only [`Emitter::next_label`] mints these, so numbers
/// are monotonic within one compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label(String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracks the operand stack depth of the method being emitted and its
/// high-water mark, which becomes the method's `.limit stack`.
#[derive(Debug, Default)]
pub struct LocalStack {
    size: i32,
    max_size: i32,
}

impl LocalStack {
    pub fn increase(&mut self, amount: i32) {
        self.size += amount;
        if self.size > self.max_size {
            self.max_size = self.size;
        }
    }

    pub fn decrease(&mut self, amount: i32) {
        self.size -= amount;
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// The high-water mark since the last reset.
    pub fn capacity(&self) -> i32 {
        self.max_size
    }

    pub fn reset(&mut self) {
        self.size = 0;
        self.max_size = 0;
    }
}

/// Allocates local variable array slots for a method. Slots reserved at
/// construction hold parameters; temporaries are reserved and released
/// as scopes need them. The running count becomes `.limit locals`.
#[derive(Debug)]
pub struct LocalVariables {
    reserved: Vec<bool>,
}

impl LocalVariables {
    pub fn new(count: usize) -> Self {
        LocalVariables {
            reserved: vec![true; count],
        }
    }

    /// Reserve the lowest free slot, extending the array if none is free.
    pub fn reserve(&mut self) -> usize {
        match self.reserved.iter().position(|in_use| !in_use) {
            Some(index) => {
                self.reserved[index] = true;
                index
            }
            None => {
                self.reserved.push(true);
                self.reserved.len() - 1
            }
        }
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.reserved.get_mut(index) {
            *slot = false;
        }
    }

    /// How many slots the method needs.
    pub fn count(&self) -> usize {
        self.reserved.len()
    }
}

/// Accumulates the Jasmin assembly text for one compilation unit and
/// owns the per-method bookkeeping: the label counter, the operand
/// stack tracker, and the local slot allocator.
#[derive(Debug)]
pub struct Emitter {
    buffer: String,
    label_count: u32,
    pub local_stack: LocalStack,
    pub local_variables: LocalVariables,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            buffer: String::new(),
            label_count: 0,
            local_stack: LocalStack::default(),
            local_variables: LocalVariables::new(0),
        }
    }

    pub fn next_label(&mut self) -> Label {
        self.label_count += 1;
        Label(format!("L{:03}", self.label_count))
    }

    pub fn emit(&mut self, opcode: Opcode) {
        self.buffer.push('\t');
        self.buffer.push_str(opcode.mnemonic());
        self.buffer.push('\n');
        self.local_stack.increase(opcode.stack_use());
    }

    pub fn emit_operand(&mut self, opcode: Opcode, operand: impl fmt::Display) {
        self.buffer
            .push_str(&format!("\t{} {}\n", opcode.mnemonic(), operand));
        self.local_stack.increase(opcode.stack_use());
    }

    pub fn emit_operands(
        &mut self,
        opcode: Opcode,
        operand1: impl fmt::Display,
        operand2: impl fmt::Display,
    ) {
        self.buffer.push_str(&format!(
            "\t{} {} {}\n",
            opcode.mnemonic(),
            operand1,
            operand2
        ));
        self.local_stack.increase(opcode.stack_use());
    }

    pub fn emit_label(&mut self, label: &Label) {
        self.buffer.push_str(&format!("{}:\n", label));
    }

    pub fn emit_directive(&mut self, directive: Directive, operand: impl fmt::Display) {
        self.buffer
            .push_str(&format!("{} {}\n", directive, operand));
    }

    pub fn emit_bare_directive(&mut self, directive: Directive) {
        self.buffer.push_str(&format!("{}\n", directive));
    }

    pub fn emit_blank_line(&mut self) {
        self.buffer.push('\n');
    }

    pub fn emit_comment(&mut self, text: &str) {
        self.buffer.push_str(&format!("; {}\n", text));
    }

    // Convenience loaders for constants, picking the shortest form.

    pub fn emit_load_int(&mut self, value: i32) {
        match value {
            -1 => self.emit(Opcode::IconstM1),
            0 => self.emit(Opcode::Iconst0),
            1 => self.emit(Opcode::Iconst1),
            2 => self.emit(Opcode::Iconst2),
            3 => self.emit(Opcode::Iconst3),
            4 => self.emit(Opcode::Iconst4),
            5 => self.emit(Opcode::Iconst5),
            -128..=127 => self.emit_operand(Opcode::Bipush, value),
            -32768..=32767 => self.emit_operand(Opcode::Sipush, value),
            _ => self.emit_operand(Opcode::Ldc, value),
        }
    }

    pub fn emit_load_float(&mut self, value: f32) {
        if value == 0.0 {
            self.emit(Opcode::Fconst0);
        } else if value == 1.0 {
            self.emit(Opcode::Fconst1);
        } else if value == 2.0 {
            self.emit(Opcode::Fconst2);
        } else {
            // {:?} keeps a trailing ".0" so the assembler reads a float.
            self.emit_operand(Opcode::Ldc, format!("{:?}", value));
        }
    }

    pub fn emit_load_string(&mut self, value: &str) {
        self.emit_operand(Opcode::Ldc, format!("\"{}\"", value));
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter::new()
    }
}
